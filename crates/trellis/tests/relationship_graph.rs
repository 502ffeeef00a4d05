//! Integration tests for the relationship graph.
//!
//! These tests drive the task and relationship services through the public
//! API and check the graph rules that must hold for both edge kinds.

use std::sync::Arc;

use chrono::NaiveDate;
use petgraph::algo::is_cyclic_directed;
use petgraph::graphmap::DiGraphMap;
use proptest::prelude::*;
use rstest::rstest;
use trellis::config::ParentPolicy;
use trellis::domain::{Edge, EdgeKind, NewTask, Progress, TaskId, TaskUpdate};
use trellis::error::Error;
use trellis::relations::RelationshipService;
use trellis::schedule::SchedulingViews;
use trellis::storage::{EdgeStore, GraphStore, MemoryStore};

mod common;
use common::Services;

async fn edges_of(services: &Services, kind: EdgeKind) -> Vec<Edge> {
    let snapshot = services.store.snapshot().await.unwrap();
    snapshot.edges(kind).await.unwrap()
}

// ============================================================================
// Validation
// ============================================================================

#[rstest]
#[case::dependency(EdgeKind::Dependency)]
#[case::parent(EdgeKind::Parent)]
#[tokio::test]
async fn reverse_edge_is_a_cycle(#[case] kind: EdgeKind) {
    let services = Services::new();
    let a = services.task("a").await;
    let b = services.task("b").await;

    services.relations.add_edge(kind, a.id, b.id).await.unwrap();
    let err = services.relations.add_edge(kind, b.id, a.id).await.unwrap_err();

    assert!(matches!(
        err,
        Error::CycleDetected { kind: k, task, counterpart }
            if k == kind && task == b.id && counterpart == a.id
    ));
    assert_eq!(edges_of(&services, kind).await, vec![Edge::new(a.id, b.id)]);
}

#[rstest]
#[case::dependency(EdgeKind::Dependency)]
#[case::parent(EdgeKind::Parent)]
#[tokio::test]
async fn self_reference_is_rejected(#[case] kind: EdgeKind) {
    let services = Services::new();
    let a = services.task("a").await;

    let err = services.relations.add_edge(kind, a.id, a.id).await.unwrap_err();

    assert!(matches!(err, Error::SelfReference { kind: k, task } if k == kind && task == a.id));
    assert!(edges_of(&services, kind).await.is_empty());
}

#[rstest]
#[case::dependency(EdgeKind::Dependency)]
#[case::parent(EdgeKind::Parent)]
#[tokio::test]
async fn adding_twice_keeps_one_edge(#[case] kind: EdgeKind) {
    let services = Services::new();
    let a = services.task("a").await;
    let b = services.task("b").await;

    services.relations.add_edge(kind, a.id, b.id).await.unwrap();
    services.relations.add_edge(kind, a.id, b.id).await.unwrap();

    assert_eq!(edges_of(&services, kind).await, vec![Edge::new(a.id, b.id)]);
}

#[rstest]
#[case::dependency(EdgeKind::Dependency)]
#[case::parent(EdgeKind::Parent)]
#[tokio::test]
async fn closing_a_three_task_loop_is_rejected(#[case] kind: EdgeKind) {
    let services = Services::new();
    let one = services.task("1").await;
    let two = services.task("2").await;
    let three = services.task("3").await;

    services.relations.add_edge(kind, one.id, two.id).await.unwrap();
    services.relations.add_edge(kind, two.id, three.id).await.unwrap();
    let err = services
        .relations
        .add_edge(kind, three.id, one.id)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::CycleDetected { .. }));
    assert_eq!(edges_of(&services, kind).await.len(), 2);
}

#[tokio::test]
async fn parent_cycle_leaves_dependencies_alone() {
    let services = Services::new();
    let ten = services.task("ten").await;
    let twenty = services.task("twenty").await;

    services
        .relations
        .add_edge(EdgeKind::Parent, ten.id, twenty.id)
        .await
        .unwrap();
    let err = services
        .relations
        .add_edge(EdgeKind::Parent, twenty.id, ten.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CycleDetected { kind: EdgeKind::Parent, .. }));

    // The dependency set is independent: the reverse direction is fine there.
    services
        .relations
        .add_edge(EdgeKind::Dependency, twenty.id, ten.id)
        .await
        .unwrap();
    assert_eq!(
        edges_of(&services, EdgeKind::Dependency).await,
        vec![Edge::new(twenty.id, ten.id)]
    );
    assert_eq!(
        edges_of(&services, EdgeKind::Parent).await,
        vec![Edge::new(ten.id, twenty.id)]
    );
}

#[tokio::test]
async fn missing_tasks_are_reported_before_anything_else() {
    let services = Services::new();
    let a = services.task("a").await;

    let err = services
        .relations
        .add_edge(EdgeKind::Dependency, TaskId(77), TaskId(77))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TaskNotFound(TaskId(77))));

    let err = services
        .relations
        .add_edge(EdgeKind::Dependency, a.id, TaskId(78))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TaskNotFound(TaskId(78))));
}

// ============================================================================
// Deletion
// ============================================================================

#[tokio::test]
async fn hard_delete_cascades_over_both_edge_sets() {
    let services = Services::new();
    let hub = services.task("hub").await;
    let up = services.task("up").await;
    let down = services.task("down").await;
    let bystander = services.task("bystander").await;

    let relations = &services.relations;
    relations.add_edge(EdgeKind::Dependency, hub.id, up.id).await.unwrap();
    relations.add_edge(EdgeKind::Dependency, down.id, hub.id).await.unwrap();
    relations.add_edge(EdgeKind::Parent, hub.id, up.id).await.unwrap();
    relations.add_edge(EdgeKind::Parent, down.id, hub.id).await.unwrap();
    relations
        .add_edge(EdgeKind::Dependency, bystander.id, up.id)
        .await
        .unwrap();

    services.tasks.hard_delete(hub.id).await.unwrap();

    for kind in EdgeKind::ALL {
        assert!(
            edges_of(&services, kind).await.iter().all(|e| !e.touches(hub.id)),
            "{kind} edges still reference the deleted task"
        );
    }
    assert_eq!(
        edges_of(&services, EdgeKind::Dependency).await,
        vec![Edge::new(bystander.id, up.id)]
    );
    assert!(matches!(
        services.tasks.get(hub.id).await.unwrap_err(),
        Error::TaskNotFound(_)
    ));
}

#[tokio::test]
async fn soft_deleted_task_cannot_gain_edges() {
    let services = Services::new();
    let a = services.task("a").await;
    let b = services.task("b").await;
    services
        .relations
        .add_edge(EdgeKind::Dependency, a.id, b.id)
        .await
        .unwrap();

    services.tasks.soft_delete(b.id).await.unwrap();

    let c = services.task("c").await;
    let err = services
        .relations
        .add_edge(EdgeKind::Dependency, c.id, b.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TaskNotFound(id) if id == b.id));
    // Existing edges survive a soft delete and can still be removed.
    assert_eq!(
        edges_of(&services, EdgeKind::Dependency).await,
        vec![Edge::new(a.id, b.id)]
    );
    services
        .relations
        .remove_edge(EdgeKind::Dependency, a.id, b.id)
        .await
        .unwrap();
    assert!(edges_of(&services, EdgeKind::Dependency).await.is_empty());
}

// ============================================================================
// Atomicity and concurrency
// ============================================================================

#[tokio::test]
async fn failed_batch_leaves_store_unchanged() {
    let services = Services::new();
    let a = services.task("a").await;
    let b = services.task("b").await;
    let c = services.task("c").await;
    services
        .relations
        .add_edge(EdgeKind::Dependency, c.id, a.id)
        .await
        .unwrap();

    // b is fine, but a -> c closes a loop: neither edge may be written.
    let err = services
        .relations
        .add_edges(EdgeKind::Dependency, a.id, &[b.id, c.id])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CycleDetected { .. }));
    assert_eq!(
        edges_of(&services, EdgeKind::Dependency).await,
        vec![Edge::new(c.id, a.id)]
    );

    let err = services
        .relations
        .replace_edges(EdgeKind::Dependency, c.id, &[b.id, TaskId(404)])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TaskNotFound(TaskId(404))));
    assert_eq!(
        edges_of(&services, EdgeKind::Dependency).await,
        vec![Edge::new(c.id, a.id)]
    );
}

#[rstest]
#[case::dependency(EdgeKind::Dependency)]
#[case::parent(EdgeKind::Parent)]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_complementary_adds_admit_exactly_one(#[case] kind: EdgeKind) {
    for _ in 0..20 {
        let services = Services::new();
        let a = services.task("a").await;
        let b = services.task("b").await;

        let forward = services.relations.clone();
        let backward = services.relations.clone();
        let first = tokio::spawn(async move { forward.add_edge(kind, a.id, b.id).await });
        let second = tokio::spawn(async move { backward.add_edge(kind, b.id, a.id).await });

        let outcomes = [first.await.unwrap(), second.await.unwrap()];
        let succeeded = outcomes.iter().filter(|r| r.is_ok()).count();
        assert_eq!(succeeded, 1);
        assert!(
            outcomes
                .iter()
                .any(|r| matches!(r, Err(Error::CycleDetected { .. })))
        );
        assert_eq!(edges_of(&services, kind).await.len(), 1);
    }
}

// ============================================================================
// Parent policy
// ============================================================================

#[tokio::test]
async fn single_parent_policy_limits_parents_only() {
    let store: Arc<dyn GraphStore> = Arc::new(MemoryStore::new());
    let relations =
        RelationshipService::with_parent_policy(Arc::clone(&store), ParentPolicy::Single);
    let tasks = trellis::tasks::TaskService::new(Arc::clone(&store));

    let child = tasks.create(NewTask::titled("child")).await.unwrap();
    let first = tasks.create(NewTask::titled("first")).await.unwrap();
    let second = tasks.create(NewTask::titled("second")).await.unwrap();

    relations
        .add_edge(EdgeKind::Parent, child.id, first.id)
        .await
        .unwrap();
    // Re-adding the current parent is still a no-op.
    relations
        .add_edge(EdgeKind::Parent, child.id, first.id)
        .await
        .unwrap();

    let err = relations
        .add_edge(EdgeKind::Parent, child.id, second.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::ParentLimit { task, existing, requested }
            if task == child.id && existing == first.id && requested == second.id
    ));

    // Dependencies are never limited.
    relations
        .add_edges(EdgeKind::Dependency, child.id, &[first.id, second.id])
        .await
        .unwrap();

    relations
        .replace_edges(EdgeKind::Parent, child.id, &[second.id])
        .await
        .unwrap();
    assert_eq!(
        relations.outgoing(EdgeKind::Parent, child.id).await.unwrap(),
        vec![second.id]
    );
}

// ============================================================================
// Views over the graph
// ============================================================================

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
}

#[tokio::test]
async fn ready_scenario_follows_dependency_chain() {
    let services = Services::new();
    let one = services.task("1").await;
    let two = services.task("2").await;
    let three = services.task("3").await;
    services
        .relations
        .add_edge(EdgeKind::Dependency, two.id, one.id)
        .await
        .unwrap();
    services
        .relations
        .add_edge(EdgeKind::Dependency, three.id, two.id)
        .await
        .unwrap();
    services.tasks.set_progress(one.id, Progress::Done).await.unwrap();

    let views = SchedulingViews::new(Arc::clone(&services.store)).at(date(12));
    let ready: Vec<TaskId> = views
        .ready_to_start()
        .await
        .unwrap()
        .iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(ready, vec![two.id]);
}

#[tokio::test]
async fn late_task_is_overdue_not_in_focus() {
    let services = Services::new();
    let late = services.task("late").await;
    services
        .tasks
        .update(
            late.id,
            TaskUpdate {
                progress: Some(Progress::InProgress),
                end_date: Some(Some(date(11))),
                ..TaskUpdate::default()
            },
        )
        .await
        .unwrap();

    let views = SchedulingViews::new(Arc::clone(&services.store)).at(date(12));
    let overdue = views.overdue().await.unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].id, late.id);
    assert!(views.today_focus().await.unwrap().is_empty());
}

// ============================================================================
// Properties
// ============================================================================

const TASKS: u64 = 6;

fn apply_requests(requests: &[(EdgeKind, u64, u64)]) -> (Vec<Edge>, Vec<Edge>) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    runtime.block_on(async {
        let services = Services::new();
        for i in 0..TASKS {
            services.task(&format!("task {i}")).await;
        }

        for &(kind, from, to) in requests {
            match services
                .relations
                .add_edge(kind, TaskId(from), TaskId(to))
                .await
            {
                Ok(_) | Err(Error::CycleDetected { .. } | Error::SelfReference { .. }) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        (
            edges_of(&services, EdgeKind::Dependency).await,
            edges_of(&services, EdgeKind::Parent).await,
        )
    })
}

fn is_acyclic(edges: &[Edge]) -> bool {
    let graph: DiGraphMap<TaskId, ()> = edges.iter().map(Edge::pair).collect();
    !is_cyclic_directed(&graph)
}

fn edge_kind() -> impl Strategy<Value = EdgeKind> {
    prop_oneof![Just(EdgeKind::Dependency), Just(EdgeKind::Parent)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn any_sequence_of_adds_keeps_both_sets_acyclic(
        requests in prop::collection::vec((edge_kind(), 1..=TASKS, 1..=TASKS), 0..40)
    ) {
        let (dependencies, parents) = apply_requests(&requests);

        for edges in [&dependencies, &parents] {
            prop_assert!(is_acyclic(edges));
            prop_assert!(edges.iter().all(|e| e.task != e.other));
        }
    }
}
