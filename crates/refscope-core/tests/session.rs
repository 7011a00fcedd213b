//! Session behavior over a facts-file scene.

use std::collections::BTreeSet;
use std::path::Path;

use refscope_core::facts::FactsOracle;
use refscope_core::{Cluster, DisplayIdentity, InspectionSession, MemberSet, Node};

const SCENE: &str = r#"
scan_roots = ["Scene"]

[entities.Scene]
depends_on = ["Player", "PlayerCollider", "Enemy"]

[entities.Player]
depends_on = ["Mesh", "Material"]

[entities.PlayerCollider]
owner = "Player"
depends_on = ["Mesh", "Material"]

[entities.Enemy]
depends_on = ["Mesh", "Editor/Gizmo"]

[entities.Orphan]
"#;

fn oracle() -> FactsOracle {
    FactsOracle::parse(SCENE, Path::new("scene.toml")).expect("valid facts")
}

fn s(id: &str) -> String {
    id.to_string()
}

fn leaf(id: &str) -> Node<String> {
    Node::leaf(s(id))
}

fn scene_root() -> Node<String> {
    Node::Cluster(Cluster::wrapping(s("Scene")))
}

fn player_group() -> Node<String> {
    Node::Cluster(Cluster::new(
        MemberSet::new([s("Player"), s("PlayerCollider")]).expect("non-empty"),
        None,
    ))
}

#[test]
fn dependency_session_groups_owned_parts() {
    let oracle = oracle();
    let mut session = InspectionSession::dependencies(&oracle);
    let roots = session.init(&s("Scene"));

    assert_eq!(roots, BTreeSet::from([scene_root()]));
    assert_eq!(session.label(&scene_root()), "Scene");

    let children: BTreeSet<_> = session
        .relations_of(&scene_root())
        .into_iter()
        .map(|relation| relation.target)
        .collect();
    assert_eq!(children, BTreeSet::from([player_group(), leaf("Enemy")]));

    // Equality ignores the anchor; the stored instance carries it.
    assert_eq!(
        session.display_identity(&player_group()),
        DisplayIdentity::Entity(&s("Player"))
    );
    assert_eq!(session.label(&player_group()), "Player");

    let stats = session.close();
    assert_eq!(stats.scans, 1);
    assert_eq!(stats.clusters_created, 2);
    assert_eq!(oracle.released().len(), 2);
}

#[test]
fn excluded_prefixes_never_reach_the_graph() {
    let oracle = oracle().with_exclude_prefixes(vec![s("Editor/")]);
    let mut session = InspectionSession::dependencies(&oracle);
    session.init(&s("Scene"));

    assert!(!session.graph().contains_node(&leaf("Editor/Gizmo")));
    let enemy: Vec<_> = session
        .relations_of(&leaf("Enemy"))
        .into_iter()
        .map(|relation| relation.target)
        .collect();
    // Mesh is displayed under the grouped player parts instead.
    assert!(enemy.is_empty());
    let parts: Vec<_> = session
        .relations_of(&player_group())
        .into_iter()
        .map(|relation| relation.target)
        .collect();
    assert_eq!(parts, vec![leaf("Material"), leaf("Mesh")]);
}

#[test]
fn reference_session_lists_referencers_of_target() {
    let oracle = oracle();
    let mut session = InspectionSession::references(&oracle, oracle.scan_roots().to_vec());
    let roots = session.init(&s("Mesh"));

    let referencers = Node::Cluster(Cluster::new(
        MemberSet::new([s("Enemy"), s("Player"), s("PlayerCollider")]).expect("non-empty"),
        None,
    ));
    assert_eq!(roots, BTreeSet::from([referencers.clone()]));
    assert_eq!(
        session.label(&referencers),
        "Enemy\nPlayer\nPlayerCollider\nin Scene"
    );
    assert_eq!(session.found_in(&referencers), BTreeSet::from([&s("Scene")]));
    assert!(matches!(
        session.display_identity(&referencers),
        DisplayIdentity::Aggregate(_)
    ));
}

#[test]
fn unreferenced_target_gets_placeholder_label() {
    let oracle = oracle();
    let mut session = InspectionSession::dependencies(&oracle);
    let roots = session.init(&s("Orphan"));

    assert_eq!(roots, BTreeSet::from([leaf("Orphan")]));
    assert_eq!(session.label(&leaf("Orphan")), "Orphan (unreferenced)");

    // A later scan with edges replaces the placeholder.
    let roots = session.init(&s("Scene"));
    assert!(!roots.contains(&leaf("Orphan")));
    assert_eq!(session.label(&leaf("Orphan")), "Orphan");
}

#[test]
fn repeated_init_converges() {
    let oracle = oracle();
    let mut session = InspectionSession::dependencies(&oracle);
    session.init(&s("Scene"));
    let once = session.graph().clone();
    session.init(&s("Scene"));

    assert_eq!(session.graph(), &once);
    let stats = session.close();
    assert_eq!(stats.scans, 2);
    assert_eq!(stats.clusters_released, 4);
}

#[test]
fn relations_and_stats_serialize_for_reports() {
    let oracle = oracle();
    let mut session = InspectionSession::dependencies(&oracle);
    session.init(&s("Enemy"));

    let relations = session.relations_of(&Node::Cluster(Cluster::wrapping(s("Enemy"))));
    let json = serde_json::to_value(&relations).expect("serialize relations");
    assert_eq!(json.as_array().map(Vec::len), Some(1));
    assert_eq!(json[0]["label"], "");

    let stats = serde_json::to_value(session.stats()).expect("serialize stats");
    assert_eq!(stats["scans"], 1);
}
