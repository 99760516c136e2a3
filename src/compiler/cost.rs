//! Credit cost estimation over a set of nodes

use crate::catalog::Catalog;
use crate::error::CompileError;
use crate::graph::Node;

/// Sum of catalog credit costs over `nodes`; zero for an empty set.
/// A step kind missing from the catalog is an error, never skipped.
pub fn estimate_credits(nodes: &[Node], catalog: &Catalog) -> Result<u32, CompileError> {
    nodes.iter().try_fold(0u32, |total, node| {
        let desc = catalog
            .lookup(node.step)
            .ok_or_else(|| CompileError::UnknownStep {
                node: node.id.clone(),
            })?;
        Ok(total + desc.credits)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StepKind;

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(estimate_credits(&[], &Catalog::standard()).unwrap(), 0);
    }

    #[test]
    fn test_sums_catalog_credits() {
        let catalog = Catalog::standard();
        let nodes = vec![
            Node::new("a", StepKind::LaunchSession),
            Node::new("b", StepKind::FillField),
        ];
        let expected = catalog.lookup(StepKind::LaunchSession).unwrap().credits
            + catalog.lookup(StepKind::FillField).unwrap().credits;
        assert_eq!(estimate_credits(&nodes, &catalog).unwrap(), expected);
    }

    #[test]
    fn test_linearity_over_disjoint_sets() {
        let catalog = Catalog::standard();
        let a = vec![
            Node::new("a1", StepKind::LaunchSession),
            Node::new("a2", StepKind::GetPageHtml),
        ];
        let b = vec![
            Node::new("b1", StepKind::AiExtract),
            Node::new("b2", StepKind::DeliverWebhook),
        ];
        let both: Vec<Node> = a.iter().chain(b.iter()).cloned().collect();

        assert_eq!(
            estimate_credits(&both, &catalog).unwrap(),
            estimate_credits(&a, &catalog).unwrap() + estimate_credits(&b, &catalog).unwrap()
        );
    }

    #[test]
    fn test_unknown_step_is_an_error() {
        // A partial catalog without LaunchSession
        let catalog = Catalog::new(vec![]);
        let nodes = vec![Node::new("a", StepKind::LaunchSession)];
        let err = estimate_credits(&nodes, &catalog).unwrap_err();
        assert!(matches!(err, CompileError::UnknownStep { node } if node == "a"));
    }
}
