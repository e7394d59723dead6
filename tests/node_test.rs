use lontar::types::{
    LEAF_MAX_CELLS, PAGE_SIZE, error::EngineError,
    node::{InternalCell, InternalNode, LeafCell, LeafNode, Node, NodeType},
    row::Row,
};

fn leaf_cell(key: u64) -> LeafCell {
    let row = Row::new(key, format!("user{key}"), format!("user{key}@example.com"));
    LeafCell::new(row.to_bytes().unwrap())
}

fn sample_leaf(keys: &[u64]) -> LeafNode {
    let mut leaf = LeafNode::new(3);
    leaf.parent = Some(0);
    leaf.next_leaf = Some(4);
    leaf.cells = keys.iter().copied().map(leaf_cell).collect();
    leaf
}

#[test]
fn test_node_type_tags() {
    assert_eq!(NodeType::from_u8(13).unwrap(), NodeType::Leaf);
    assert_eq!(NodeType::from_u8(5).unwrap(), NodeType::Internal);
    assert_eq!(NodeType::Leaf.as_u8(), 13);
    assert!(matches!(
        NodeType::from_u8(7),
        Err(EngineError::InvalidNodeType(7))
    ));
}

#[test]
fn test_leaf_round_trip() {
    let leaf = sample_leaf(&[1, 5, 9]);
    let node = Node::Leaf(leaf.clone());
    let bytes = node.to_bytes();
    assert_eq!(bytes.len(), PAGE_SIZE);
    let decoded = Node::from_bytes(3, &bytes).unwrap();
    assert_eq!(decoded, node);
}

#[test]
fn test_leaf_round_trip_empty() {
    let mut leaf = LeafNode::new(0);
    leaf.next_leaf = None;
    let node = Node::Leaf(leaf);
    let decoded = Node::from_bytes(0, &node.to_bytes()).unwrap();
    assert_eq!(decoded, node);
}

#[test]
fn test_internal_round_trip() {
    let internal = InternalNode {
        page_id: 0,
        parent: None,
        right_child: 2,
        cells: vec![
            InternalCell { key: 10, child: 1 },
            InternalCell { key: 20, child: 3 },
        ],
    };
    let node = Node::Internal(internal);
    let decoded = Node::from_bytes(0, &node.to_bytes()).unwrap();
    assert_eq!(decoded, node);
}

#[test]
fn test_find_cell_binary_search() {
    let leaf = sample_leaf(&[10, 20, 30]);
    assert_eq!(leaf.find_cell(5), 0); // before first
    assert_eq!(leaf.find_cell(10), 0); // exact match
    assert_eq!(leaf.find_cell(15), 1); // between
    assert_eq!(leaf.find_cell(30), 2);
    assert_eq!(leaf.find_cell(99), 3); // past last: insertion point
}

#[test]
fn test_find_child_routing() {
    let internal = InternalNode {
        page_id: 0,
        parent: None,
        right_child: 9,
        cells: vec![
            InternalCell { key: 10, child: 7 },
            InternalCell { key: 20, child: 8 },
        ],
    };
    // A cell (k, c) holds keys strictly below k.
    assert_eq!(internal.find_child(3), 7);
    assert_eq!(internal.find_child(9), 7);
    assert_eq!(internal.find_child(10), 8);
    assert_eq!(internal.find_child(19), 8);
    assert_eq!(internal.find_child(20), 9);
    assert_eq!(internal.find_child(500), 9);
    assert_eq!(internal.leftmost_child(), 7);
}

#[test]
fn test_max_key_and_capacity() {
    let leaf = sample_leaf(&[10, 20, 30]);
    assert_eq!(leaf.max_key(), Some(30));
    assert!(!leaf.is_full());
    let full = sample_leaf(&(0..LEAF_MAX_CELLS as u64).collect::<Vec<_>>());
    assert!(full.is_full());
}

#[test]
fn test_zeroed_page_rejected() {
    let err = Node::from_bytes(5, &[0u8; PAGE_SIZE]).unwrap_err();
    assert!(matches!(err, EngineError::InvalidNodeType(0)));
    assert!(err.is_fatal());
}

#[test]
fn test_wrong_page_size_rejected() {
    assert!(matches!(
        Node::from_bytes(0, &[13u8; 100]),
        Err(EngineError::InvalidPageSize { .. })
    ));
}

#[test]
fn test_bit_flip_fails_checksum() {
    let node = Node::Leaf(sample_leaf(&[1, 2, 3]));
    let mut bytes = node.to_bytes();
    bytes[PAGE_SIZE / 2] ^= 0x01;
    let err = Node::from_bytes(3, &bytes).unwrap_err();
    match err {
        EngineError::CorruptedPage { page_id, reason } => {
            assert_eq!(page_id, 3);
            assert!(reason.contains("checksum"));
        }
        other => panic!("expected CorruptedPage, got {other:?}"),
    }
}

#[test]
fn test_unsorted_keys_rejected_on_decode() {
    // A well-checksummed page can still violate the ordering invariant.
    let node = Node::Leaf(sample_leaf(&[30, 10, 20]));
    let err = Node::from_bytes(3, &node.to_bytes()).unwrap_err();
    match err {
        EngineError::CorruptedPage { reason, .. } => {
            assert!(reason.contains("strictly increasing"));
        }
        other => panic!("expected CorruptedPage, got {other:?}"),
    }
}
