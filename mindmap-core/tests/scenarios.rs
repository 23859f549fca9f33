//! End-to-end scenarios exercising the full query pipeline through the
//! public `MindMap` API, one test per named scenario.

use mindmap_core::config::{ActivationConfig, MindMapConfig, PipelineConfig};
use mindmap_core::pipeline::{QueryRequest, UpdateFromTaskRequest};
use mindmap_core::types::{Edge, EdgeKind, Node, NodeId, NodeKind, QueryContext, TaskOutcomeTag};
use mindmap_core::MindMap;
use std::time::{Duration, Instant};

fn basic_graph() -> MindMap {
    let mm = MindMap::default();
    mm.graph.add_node(Node::new("f", NodeKind::File, "MindMapEngine.ts").with_path("MindMapEngine.ts"));
    mm.graph.add_node(Node::new("c", NodeKind::Class, "MindMapEngine"));
    mm.graph.add_node(Node::new("m", NodeKind::Function, "query"));
    mm.graph
        .add_edge(Edge::new(NodeId::from("f"), NodeId::from("c"), EdgeKind::Contains, 0.9, 0.9))
        .unwrap();
    mm.graph
        .add_edge(Edge::new(NodeId::from("c"), NodeId::from("m"), EdgeKind::Contains, 0.9, 0.9))
        .unwrap();
    mm
}

#[test]
fn s1_basic_retrieval_returns_all_three_connected_nodes() {
    let mm = basic_graph();
    let response = mm
        .query(QueryRequest {
            query_text: "MindMapEngine".into(),
            hop_cap: Some(2),
            ..Default::default()
        })
        .unwrap();

    let ids: Vec<NodeId> = response.results.iter().map(|r| r.id.clone()).collect();
    assert!(ids.contains(&NodeId::from("c")));
    assert!(ids.contains(&NodeId::from("f")));
    assert!(ids.contains(&NodeId::from("m")));
    // Class matches the query text exactly; the containing file scores
    // next by proximity through `contains`, the nested function trails.
    assert_eq!(ids[0], NodeId::from("c"));
}

#[test]
fn s2_repeated_query_hits_cache_and_is_not_slower() {
    let mm = basic_graph();
    let request = QueryRequest { query_text: "MindMapEngine".into(), hop_cap: Some(2), ..Default::default() };

    let start_first = Instant::now();
    let first = mm.query(request.clone()).unwrap();
    let first_elapsed = start_first.elapsed();
    assert!(!first.from_cache);

    let start_second = Instant::now();
    let second = mm.query(request).unwrap();
    let second_elapsed = start_second.elapsed();
    assert!(second.from_cache);
    assert!(second_elapsed <= first_elapsed + Duration::from_millis(5));
}

#[test]
fn s3_inhibition_suppresses_then_bypass_recovers_score() {
    let mm = basic_graph();
    mm.update_from_task(UpdateFromTaskRequest {
        node_ids: vec![NodeId::from("c")],
        description: "Property X does not exist on a.ts".into(),
        outcome: TaskOutcomeTag::Error,
        error_type: None,
        error_message: None,
        files_involved: vec![],
    });

    let context = QueryContext {
        current_task: Some("Property X does not exist on a.ts".into()),
        ..Default::default()
    };

    let suppressed = mm
        .query(QueryRequest {
            query_text: "property X".into(),
            context: Some(context.clone()),
            ..Default::default()
        })
        .unwrap();
    let bypassed = mm
        .query(QueryRequest {
            query_text: "property X".into(),
            context: Some(context),
            bypass_inhibition: true,
            ..Default::default()
        })
        .unwrap();

    let suppressed_score = suppressed.results.iter().find(|r| r.id == NodeId::from("c")).map(|r| r.score);
    let bypassed_score = bypassed.results.iter().find(|r| r.id == NodeId::from("c")).map(|r| r.score);
    assert!(suppressed_score.is_some() && bypassed_score.is_some());
    assert!(bypassed_score.unwrap() > suppressed_score.unwrap());
}

#[test]
fn s4_hebbian_emergence_after_repeated_co_query() {
    let mm = basic_graph();
    let request = QueryRequest { query_text: "MindMapEngine query".into(), hop_cap: Some(2), ..Default::default() };

    mm.query(request.clone()).unwrap();
    mm.clear_cache();
    let response = mm.query(request).unwrap();

    let top_two: Vec<NodeId> = response.results.iter().take(2).map(|r| r.id.clone()).collect();
    assert_eq!(top_two.len(), 2);

    let edges = mm.graph.edges_of_kind(&top_two[0], EdgeKind::CoActivates);
    let edge = edges.iter().find(|e| {
        (e.source == top_two[0] && e.target == top_two[1]) || (e.source == top_two[1] && e.target == top_two[0])
    });
    assert!(edge.is_some());
    assert!(edge.unwrap().weight >= 0.2);
}

#[test]
fn s5_path_invalidation_forces_cache_miss_and_recompute() {
    let mm = basic_graph();
    let request = QueryRequest { query_text: "MindMapEngine".into(), hop_cap: Some(2), ..Default::default() };

    let first = mm.query(request.clone()).unwrap();
    assert!(!first.from_cache);
    let cached = mm.query(request.clone()).unwrap();
    assert!(cached.from_cache);

    mm.update_from_task(UpdateFromTaskRequest {
        node_ids: vec![NodeId::from("f")],
        description: "touched MindMapEngine.ts".into(),
        outcome: TaskOutcomeTag::Success,
        error_type: None,
        error_message: None,
        files_involved: vec![],
    });

    let after_invalidate = mm.query(request).unwrap();
    assert!(!after_invalidate.from_cache);
}

#[test]
fn s6_deadline_truncates_then_unbounded_query_returns_a_superset() {
    // A single seed fanning out to 10^5 direct neighbors puts well over
    // 10^5 edges within one hop of the seed. A near-zero deadline forces
    // truncation deterministically, independent of machine speed; the
    // same graph queried with a generous deadline explores further.
    const FANOUT: usize = 100_000;

    let build_graph = |mm: &MindMap| {
        mm.graph.add_node(Node::new("seed", NodeKind::Function, "seed"));
        for i in 0..FANOUT {
            let id = format!("n{i}");
            mm.graph.add_node(Node::new(id.as_str(), NodeKind::Function, id.as_str()));
            mm.graph
                .add_edge(Edge::new(NodeId::from("seed"), NodeId::from(id.as_str()), EdgeKind::Calls, 0.8, 0.8))
                .unwrap();
        }
    };

    let tight = MindMap::new(MindMapConfig {
        pipeline: PipelineConfig { deadline: Duration::from_nanos(1), ..PipelineConfig::default() },
        activation: ActivationConfig { max_traversals_multiplier: 1_000_000, ..ActivationConfig::default() },
        ..MindMapConfig::default()
    });
    build_graph(&tight);

    let generous = MindMap::new(MindMapConfig {
        pipeline: PipelineConfig { deadline: Duration::from_secs(15), ..PipelineConfig::default() },
        activation: ActivationConfig { max_traversals_multiplier: 1_000_000, ..ActivationConfig::default() },
        ..MindMapConfig::default()
    });
    build_graph(&generous);

    let request = QueryRequest { query_text: "seed".into(), hop_cap: Some(3), limit: Some(1000), ..Default::default() };

    let truncated_response = tight.query(request.clone()).unwrap();
    assert!(truncated_response.truncated);
    assert!(!truncated_response.from_cache);

    let full_response = generous.query(request).unwrap();
    assert!(full_response.results.len() > truncated_response.results.len());
}
