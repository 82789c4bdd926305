//! Card to canvas-node mapping

use super::types::{CardNodeData, FlowNode};
use crate::config::{CARD_NODE_TYPE, GRID_COLUMNS, GRID_SPACING_X, GRID_SPACING_Y};
use crate::database::{Card, Position};

/// Map cards to card nodes.
///
/// Cards without a saved placement are laid on a fixed-column grid by their
/// index in `cards`, so two unplaced cards never share a position.
pub fn cards_to_nodes(cards: &[Card]) -> Vec<FlowNode> {
    cards
        .iter()
        .enumerate()
        .map(|(index, card)| FlowNode {
            id: card.id.clone(),
            node_type: CARD_NODE_TYPE.to_string(),
            position: card.position().unwrap_or_else(|| grid_position(index)),
            data: CardNodeData {
                title: card.title.clone(),
                content: card.content.clone(),
                tags: card
                    .tags
                    .iter()
                    .map(|t| t.trim())
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect(),
            },
            width: None,
            height: None,
            selected: false,
        })
        .collect()
}

/// Fallback position for the card at `index`
pub fn grid_position(index: usize) -> Position {
    let column = index % GRID_COLUMNS;
    let row = index / GRID_COLUMNS;
    Position::new(column as f64 * GRID_SPACING_X, row as f64 * GRID_SPACING_Y)
}

/// `(node id, position)` pairs, for persisting a layout
pub fn node_position_updates(nodes: &[FlowNode]) -> Vec<(String, Position)> {
    nodes.iter().map(|n| (n.id.clone(), n.position)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashSet;

    fn card(id: &str, position: Option<(f64, f64)>, tags: &[&str]) -> Card {
        Card {
            id: id.to_string(),
            title: format!("Card {}", id),
            content: "{}".to_string(),
            project_id: None,
            user_id: "u".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            position_x: position.map(|p| p.0),
            position_y: position.map(|p| p.1),
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(cards_to_nodes(&[]).is_empty());
    }

    #[test]
    fn test_node_shape() {
        let nodes = cards_to_nodes(&[card("a", Some((12.5, -3.0)), &["rust", "개발"])]);

        assert_eq!(nodes.len(), 1);
        let node = &nodes[0];
        assert_eq!(node.id, "a");
        assert_eq!(node.node_type, "card");
        assert_eq!(node.position, Position::new(12.5, -3.0));
        assert_eq!(node.data.title, "Card a");
        assert_eq!(node.data.tags, vec!["rust", "개발"]);
    }

    #[test]
    fn test_grid_fallback_is_unique() {
        let cards: Vec<Card> = (0..23).map(|i| card(&i.to_string(), None, &[])).collect();
        let nodes = cards_to_nodes(&cards);

        let distinct: HashSet<(u64, u64)> = nodes
            .iter()
            .map(|n| (n.position.x.to_bits(), n.position.y.to_bits()))
            .collect();
        assert_eq!(distinct.len(), cards.len());

        assert_eq!(nodes[0].position, Position::new(0.0, 0.0));
        assert_eq!(nodes[GRID_COLUMNS].position, Position::new(0.0, GRID_SPACING_Y));
        assert_eq!(nodes[GRID_COLUMNS + 1].position, Position::new(GRID_SPACING_X, GRID_SPACING_Y));
    }

    #[test]
    fn test_saved_positions_take_precedence() {
        let nodes = cards_to_nodes(&[card("a", None, &[]), card("b", Some((999.0, 999.0)), &[])]);

        assert_eq!(nodes[0].position, grid_position(0));
        assert_eq!(nodes[1].position, Position::new(999.0, 999.0));
    }

    #[test]
    fn test_blank_tags_dropped() {
        let nodes = cards_to_nodes(&[card("a", None, &["", "  ", "ok"])]);
        assert_eq!(nodes[0].data.tags, vec!["ok"]);
    }

    #[test]
    fn test_half_saved_position_uses_grid() {
        let mut c = card("a", None, &[]);
        c.position_x = Some(5.0);
        let nodes = cards_to_nodes(&[c]);
        assert_eq!(nodes[0].position, grid_position(0));
    }
}
