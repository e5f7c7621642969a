use pretty_assertions::assert_eq;
use regnav_client::{CancellationToken, ReferrerDescriptor};
use regnav_core::{ReferrerGraphBuilder, ReferrerNode, ReferrerProgress, ANNOTATIONS_LABEL};
use regnav_test_utils::{referrer, InMemoryRegistry, IMAGE_MANIFEST};
use std::collections::HashSet;
use std::sync::Arc;

const ROOT: &str = "sha256:root";

async fn build(registry: InMemoryRegistry) -> (Vec<ReferrerNode>, usize) {
    let progress = ReferrerProgress::new();
    let tree = ReferrerGraphBuilder::new(Arc::new(registry))
        .build_referrer_tree("org/app", ROOT, &progress, &CancellationToken::new())
        .await
        .unwrap();
    (tree, progress.discovered())
}

fn labels(nodes: &[ReferrerNode]) -> Vec<&str> {
    nodes.iter().map(|n| n.display_label.as_str()).collect()
}

#[tokio::test]
async fn test_cycle_terminates_and_repeat_has_no_children() {
    let registry = InMemoryRegistry::new()
        .with_referrers("sha256:a", vec![referrer("sha256:b", "application/x")])
        .with_referrers("sha256:b", vec![referrer("sha256:a", "application/x")]);

    let progress = ReferrerProgress::new();
    let tree = ReferrerGraphBuilder::new(Arc::new(registry))
        .build_referrer_tree("org/app", "sha256:a", &progress, &CancellationToken::new())
        .await
        .unwrap();

    let b = &tree[0].children[0];
    assert_eq!(b.digest(), Some("sha256:b"));
    let a_again = &b.children[0].children[0];
    assert_eq!(a_again.digest(), Some("sha256:a"));
    assert!(a_again.children.is_empty());
    assert_eq!(progress.discovered(), 2);
}

#[tokio::test]
async fn test_shared_referrer_is_expanded_once() {
    let registry = InMemoryRegistry::new()
        .with_referrers(
            ROOT,
            vec![referrer("sha256:s1", "sig"), referrer("sha256:s2", "sig")],
        )
        .with_referrers("sha256:s1", vec![referrer("sha256:shared", "sbom")])
        .with_referrers("sha256:s2", vec![referrer("sha256:shared", "sbom")])
        .with_referrers("sha256:shared", vec![referrer("sha256:leaf", "att")]);

    let (tree, discovered) = build(registry).await;

    let sigs = &tree[0].children;
    let first_shared = &sigs[0].children[0].children[0];
    let second_shared = &sigs[1].children[0].children[0];
    assert_eq!(first_shared.children.len(), 1);
    assert!(second_shared.children.is_empty());
    assert_eq!(discovered, 5);
}

#[tokio::test]
async fn test_groups_sort_case_insensitively() {
    let registry = InMemoryRegistry::new().with_referrers(
        ROOT,
        vec![
            referrer("sha256:1", "SignatureType"),
            referrer("sha256:2", "application/x"),
            referrer("sha256:3", "application/vnd.cncf.notary.signature"),
            ReferrerDescriptor::new("sha256:4", IMAGE_MANIFEST),
        ],
    );

    let (tree, _) = build(registry).await;
    assert_eq!(
        labels(&tree),
        vec![
            "application/vnd.cncf.notary.signature",
            IMAGE_MANIFEST,
            "application/x",
            "SignatureType",
        ]
    );
    assert!(tree.iter().all(|group| group.is_group && group.info.is_none()));
}

#[tokio::test]
async fn test_group_members_sort_by_digest_ignoring_case() {
    let registry = InMemoryRegistry::new().with_referrers(
        ROOT,
        vec![
            referrer("sha256:C3", "sig"),
            referrer("sha256:a1", "sig"),
            referrer("sha256:B2", "sig"),
        ],
    );

    let (tree, _) = build(registry).await;
    assert_eq!(labels(&tree[0].children), vec!["sha256:a1", "sha256:B2", "sha256:C3"]);
}

#[tokio::test]
async fn test_annotations_group_leads_children() {
    let registry = InMemoryRegistry::new()
        .with_referrers(
            ROOT,
            vec![referrer("sha256:sig", "sig")
                .with_annotation("org.opencontainers.image.created", "2024-01-01")
                .with_annotation("dev.cosignproject.cosign/signature", "MEUC")],
        )
        .with_referrers("sha256:sig", vec![referrer("sha256:nested", "att")]);

    let (tree, _) = build(registry).await;
    let sig = &tree[0].children[0];
    assert_eq!(labels(&sig.children), vec![ANNOTATIONS_LABEL, "att"]);
    assert_eq!(
        labels(&sig.children[0].children),
        vec![
            "dev.cosignproject.cosign/signature: MEUC",
            "org.opencontainers.image.created: 2024-01-01",
        ]
    );
    let info = sig.info.as_ref().unwrap();
    assert_eq!(info.artifact_type, "sig");
    assert_eq!(info.annotations.len(), 2);
}

#[tokio::test]
async fn test_fetch_failure_yields_empty_subtree() {
    let registry = InMemoryRegistry::new()
        .with_referrers(ROOT, vec![referrer("sha256:ok", "sig"), referrer("sha256:bad", "sig")])
        .with_referrers("sha256:ok", vec![referrer("sha256:child", "att")])
        .with_referrers("sha256:bad", vec![referrer("sha256:unseen", "att")])
        .with_failing_referrers("sha256:bad");

    let (tree, _) = build(registry).await;
    let members = &tree[0].children;
    assert_eq!(labels(members), vec!["sha256:bad", "sha256:ok"]);
    assert!(members[0].children.is_empty());
    assert_eq!(members[1].children.len(), 1);
}

#[tokio::test]
async fn test_unresolvable_root_is_empty_tree() {
    let (tree, discovered) = build(InMemoryRegistry::new()).await;
    assert!(tree.is_empty());
    assert_eq!(discovered, 0);
}

#[tokio::test]
async fn test_node_ids_are_unique_and_stable() {
    let registry = || {
        InMemoryRegistry::new()
            .with_referrers(
                ROOT,
                vec![
                    referrer("sha256:x", "sig").with_annotation("k", "v"),
                    referrer("sha256:y", "sbom"),
                ],
            )
            .with_referrers("sha256:x", vec![referrer("sha256:y", "sbom")])
    };

    let (first, _) = build(registry()).await;
    let (second, _) = build(registry()).await;
    assert_eq!(first, second);

    let mut seen = HashSet::new();
    for node in first.iter().flat_map(ReferrerNode::walk) {
        assert!(seen.insert(node.id.clone()), "duplicate id {}", node.id);
    }
}
