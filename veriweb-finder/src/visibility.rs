use crate::error::FindError;
use crate::matcher::CandidateSet;
use tracing::trace;
use veriweb_drivers::Browser;

/// Drop candidates the browser does not render. A no-op without driver
/// calls when `required` is false.
pub async fn filter(
    browser: &dyn Browser,
    candidates: CandidateSet,
    required: bool,
) -> Result<CandidateSet, FindError> {
    if !required {
        return Ok(candidates);
    }
    let before = candidates.len();
    let mut visible = Vec::with_capacity(before);
    for candidate in candidates {
        if browser.element_visible(&candidate.node.handle).await? {
            visible.push(candidate);
        }
    }
    trace!(
        target: "finder.visibility",
        before,
        after = visible.len(),
        "finder.visibility.filter"
    );
    Ok(visible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::collect;
    use crate::matcher::match_nodes;
    use crate::request::LocatorKind;
    use veriweb_drivers::memory::{MemoryBrowser, MemoryEvent, MemoryNode};

    #[tokio::test]
    async fn hidden_candidates_are_dropped_only_when_required() {
        let browser = MemoryBrowser::new(vec![
            MemoryNode::new("p").text("Total").hidden(),
            MemoryNode::new("p").text("Total"),
        ]);
        let nodes = collect(&browser, false, &Vec::new()).await.unwrap();
        let matched = match_nodes(&nodes, "Total", LocatorKind::Text, false, false).unwrap();

        let visible = filter(&browser, matched.clone(), true).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].node.path, vec![1]);

        let all = filter(&browser, matched, false).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn detached_candidates_report_stale_context() {
        let browser = MemoryBrowser::new(vec![MemoryNode::new("p").id("gone").text("Bye")]);
        let nodes = collect(&browser, false, &Vec::new()).await.unwrap();
        let matched = match_nodes(&nodes, "Bye", LocatorKind::Text, false, false).unwrap();
        browser.remove("gone").await;
        assert!(matches!(
            filter(&browser, matched, true).await,
            Err(FindError::StaleContext(_))
        ));
        assert!(browser.events().await.iter().all(|e| !matches!(e, MemoryEvent::Click { .. })));
    }
}
