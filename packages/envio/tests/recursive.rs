//! Records that reach themselves through an optional field.

use envio::{Engine, MemoryEnv};

#[derive(Debug, Default, PartialEq)]
struct Node {
    name: String,
    next: Option<Box<Node>>,
}

envio::record!(Node {
    name: "NODE_NAME",
    next,
});

#[derive(Debug, Default, PartialEq)]
struct Left {
    tag: String,
    right: Option<Box<Right>>,
}

envio::record!(Left {
    tag: "LEFT_TAG",
    right,
});

#[derive(Debug, Default, PartialEq)]
struct Right {
    tag: String,
    left: Option<Box<Left>>,
}

envio::record!(Right {
    tag: "RIGHT_TAG",
    left,
});

#[test]
fn test_absent_self_reference_stays_absent_on_get() {
    let engine = Engine::new(MemoryEnv::from_pairs([("NODE_NAME", "a")]));
    let mut node = Node::default();
    engine.get(&mut node).unwrap();

    assert_eq!(
        node,
        Node {
            name: "a".to_string(),
            next: None,
        }
    );
}

#[test]
fn test_present_self_reference_is_followed_on_get() {
    let engine = Engine::new(MemoryEnv::from_pairs([("NODE_NAME", "a")]));
    let mut node = Node {
        next: Some(Box::default()),
        ..Default::default()
    };
    engine.get(&mut node).unwrap();

    assert_eq!(node.name, "a");
    assert_eq!(node.next.as_ref().map(|n| n.name.as_str()), Some("a"));
    assert!(node.next.as_ref().is_some_and(|n| n.next.is_none()));
}

#[test]
fn test_absent_self_reference_is_skipped_on_set() {
    let engine = Engine::new(MemoryEnv::new());
    engine.set(&Node::default()).unwrap();

    let vars = engine.store().snapshot();
    assert_eq!(vars.len(), 1);
    assert_eq!(vars["NODE_NAME"], "");
}

#[test]
fn test_present_self_reference_is_written_on_set() {
    let engine = Engine::new(MemoryEnv::new());
    engine
        .set(&Node {
            name: "a".to_string(),
            next: Some(Box::new(Node {
                name: "b".to_string(),
                next: None,
            })),
        })
        .unwrap();

    // The inner node binds the same key and is written last.
    let vars = engine.store().snapshot();
    assert_eq!(vars.len(), 1);
    assert_eq!(vars["NODE_NAME"], "b");
}

#[test]
fn test_mutual_references_stop_at_the_repeat() {
    let engine = Engine::new(MemoryEnv::from_pairs([("LEFT_TAG", "l"), ("RIGHT_TAG", "r")]));

    let mut left = Left::default();
    engine.get(&mut left).unwrap();
    assert_eq!(
        left,
        Left {
            tag: "l".to_string(),
            right: Some(Box::new(Right {
                tag: "r".to_string(),
                left: None,
            })),
        }
    );

    let mut right = Right::default();
    engine.get(&mut right).unwrap();
    assert_eq!(right.tag, "r");
    assert_eq!(right.left.as_ref().map(|l| l.tag.as_str()), Some("l"));
    assert!(right.left.as_ref().is_some_and(|l| l.right.is_none()));

    let engine = Engine::new(MemoryEnv::new());
    engine.set(&Left::default()).unwrap();
    let vars = engine.store().snapshot();
    assert_eq!(vars.len(), 2);
    assert_eq!(vars["LEFT_TAG"], "");
    assert_eq!(vars["RIGHT_TAG"], "");
}
