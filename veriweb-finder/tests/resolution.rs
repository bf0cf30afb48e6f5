mod common;

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use veriweb_common::SearchConfig;
use veriweb_drivers::memory::{MemoryBrowser, MemoryEvent, MemoryNode};
use veriweb_finder::{Action, Anchor, FindError, Finder, SearchRequest};

fn config() -> SearchConfig {
    SearchConfig {
        default_timeout: Duration::from_millis(500),
        poll_interval: Duration::from_millis(100),
        ..SearchConfig::default()
    }
}

fn button(id: &str, text: &str) -> MemoryNode {
    MemoryNode::new("button").id(id).text(text)
}

fn id_of(el: &veriweb_finder::ResolvedElement) -> &str {
    el.node.attribute("id").unwrap_or_default()
}

fn people_table() -> MemoryBrowser {
    let row = |n: usize, name: &str| {
        MemoryNode::new("tr").children([
            MemoryNode::new("td").text(name),
            MemoryNode::new("td").child(button(&format!("edit-{n}"), "Edit")),
        ])
    };
    MemoryBrowser::new(vec![MemoryNode::new("table").children([
        row(1, "Alice"),
        row(2, "Bob"),
        row(3, "Carol"),
    ])])
}

#[tokio::test(start_paused = true)]
async fn resolution_is_deterministic() {
    common::init_test_tracing();
    let browser = MemoryBrowser::new(vec![button("a", "Save"), button("b", "Save")]);
    let config = config();
    let finder = Finder::new(&browser, &config);
    let req = SearchRequest::text("Save", &config);

    let first = finder.resolve(&req).await.unwrap();
    let again = finder.resolve(&req).await.unwrap();
    assert_eq!(id_of(&first), "a");
    assert_eq!(first.node.handle, again.node.handle);
}

#[tokio::test(start_paused = true)]
async fn shadow_content_needs_shadow_search() {
    let document = || {
        vec![MemoryNode::new("x-panel").shadow([MemoryNode::new("span").text("Hidden gem")])]
    };
    let mut config = config();
    let browser = MemoryBrowser::new(document());
    let req = SearchRequest::text("Hidden gem", &config);

    let failure = Finder::new(&browser, &config).resolve(&req).await.unwrap_err();
    assert!(failure.is_timeout());
    assert!(failure.to_string().contains("shadow DOM off"));

    config.shadow_dom = true;
    let found = Finder::new(&browser, &config).resolve(&req).await.unwrap();
    assert!(found.node.in_shadow);
}

#[tokio::test(start_paused = true)]
async fn partial_match_gates_substring_hits() {
    let browser = MemoryBrowser::new(vec![MemoryNode::new("p").text("Order 1234 confirmed")]);
    let config = config();
    let finder = Finder::new(&browser, &config);

    let partial = SearchRequest::text("1234", &config).partial(true);
    assert!(finder.resolve(&partial).await.is_ok());

    let exact = SearchRequest::text("1234", &config).partial(false);
    assert!(finder.resolve(&exact).await.unwrap_err().is_timeout());
}

#[tokio::test(start_paused = true)]
async fn numeric_anchor_picks_nth_match() {
    let browser = people_table();
    let config = config();
    let finder = Finder::new(&browser, &config);
    let req = SearchRequest::text("Edit", &config).anchor(Anchor::parse("2"));
    assert_eq!(id_of(&finder.resolve(&req).await.unwrap()), "edit-2");

    let out_of_range = SearchRequest::text("Edit", &config).anchor(Anchor::parse("7"));
    let failure = finder.resolve(&out_of_range).await.unwrap_err();
    assert_eq!(
        failure.error,
        FindError::AnchorOutOfRange { index: 7, count: 3 }
    );
    assert_eq!(failure.diagnostics.attempts, 1);
}

#[tokio::test(start_paused = true)]
async fn text_anchor_picks_the_nearest_match() {
    let browser = people_table();
    let config = config();
    let finder = Finder::new(&browser, &config);
    let req = SearchRequest::text("Edit", &config).anchor(Anchor::parse("Carol"));
    assert_eq!(id_of(&finder.resolve(&req).await.unwrap()), "edit-3");
}

#[tokio::test(start_paused = true)]
async fn strict_mode_reports_ambiguity() {
    let browser = people_table();
    let config = config();
    let req = SearchRequest::text("Edit", &config).strict(true);
    let failure = Finder::new(&browser, &config).resolve(&req).await.unwrap_err();
    assert!(matches!(
        failure.error.root(),
        FindError::AmbiguousMatch { count: 3, .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn count_follows_the_shadow_switch() {
    let browser = MemoryBrowser::new(vec![
        MemoryNode::new("p").text("Total"),
        MemoryNode::new("x-summary").shadow([MemoryNode::new("p").text("Total")]),
    ]);
    let mut config = config();
    let req = SearchRequest::text("Total", &config);
    assert_eq!(Finder::new(&browser, &config).count(&req).await.unwrap(), 1);
    config.shadow_dom = true;
    assert_eq!(Finder::new(&browser, &config).count(&req).await.unwrap(), 2);
    assert_eq!(
        Finder::new(&browser, &config)
            .expect_count(&req, 2)
            .await
            .unwrap(),
        2
    );
}

#[tokio::test(start_paused = true)]
async fn count_is_zero_after_timeout() {
    let browser = MemoryBrowser::new(vec![MemoryNode::new("p").text("Nothing here")]);
    let config = config();
    let req = SearchRequest::text("Missing", &config);
    let started = tokio::time::Instant::now();
    assert_eq!(Finder::new(&browser, &config).count(&req).await.unwrap(), 0);
    assert!(started.elapsed() >= Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn count_reports_driver_trouble_instead_of_zero() {
    let browser = MemoryBrowser::new(vec![MemoryNode::new("p").text("Total")]);
    browser.inject_stale_queries(100).await;
    let config = config();
    let req = SearchRequest::text("Total", &config);
    let failure = Finder::new(&browser, &config).count(&req).await.unwrap_err();
    assert!(failure.is_timeout());
    assert!(matches!(failure.error.root(), FindError::StaleContext(_)));
}

#[tokio::test(start_paused = true)]
async fn timeout_stays_within_one_interval_of_the_deadline() {
    let browser = MemoryBrowser::new(Vec::new());
    let config = SearchConfig {
        poll_interval: Duration::from_millis(300),
        ..SearchConfig::default()
    };
    let req = SearchRequest::text("Never", &config).timeout(Duration::from_secs(2));
    let failure = Finder::new(&browser, &config).resolve(&req).await.unwrap_err();
    let elapsed = failure.diagnostics.elapsed;
    assert!(elapsed >= Duration::from_secs(2), "{elapsed:?}");
    assert!(elapsed <= Duration::from_millis(2300), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn late_elements_are_found_by_polling() {
    let browser = MemoryBrowser::new(vec![MemoryNode::new("div").id("root")]);
    let config = config();
    let finder = Finder::new(&browser, &config);
    let req = SearchRequest::text("Loaded", &config);

    let render = async {
        tokio::time::sleep(Duration::from_millis(250)).await;
        browser
            .insert(Some("root"), MemoryNode::new("p").text("Loaded"))
            .await
            .unwrap();
    };
    let (found, ()) = tokio::join!(finder.resolve(&req), render);
    assert_eq!(found.unwrap().node.text, "Loaded");
}

#[tokio::test(start_paused = true)]
async fn stale_documents_are_retried() {
    let browser = MemoryBrowser::new(vec![button("ok", "OK")]);
    browser.inject_stale_queries(2).await;
    let config = config();
    let req = SearchRequest::text("OK", &config);
    assert_eq!(
        id_of(&Finder::new(&browser, &config).resolve(&req).await.unwrap()),
        "ok"
    );
}

#[tokio::test(start_paused = true)]
async fn verify_is_idempotent() {
    let browser = MemoryBrowser::new(vec![button("go", "Go")]);
    let config = config();
    let finder = Finder::new(&browser, &config);
    let req = SearchRequest::text("Go", &config);
    finder.perform(&req, &Action::VerifyExists).await.unwrap();
    finder.perform(&req, &Action::VerifyExists).await.unwrap();
    assert!(browser.clicks().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancelled_searches_stop_without_probing() {
    let browser = MemoryBrowser::new(Vec::new());
    let config = config();
    let token = CancellationToken::new();
    token.cancel();
    let req = SearchRequest::text("Anything", &config);
    let failure = Finder::new(&browser, &config)
        .with_cancel(token)
        .resolve(&req)
        .await
        .unwrap_err();
    assert_eq!(failure.error, FindError::Cancelled);
    assert_eq!(failure.diagnostics.attempts, 0);
}

#[tokio::test(start_paused = true)]
async fn frames_are_searched_after_the_top_document() {
    let browser = MemoryBrowser::new(vec![
        MemoryNode::new("p").text("Top"),
        MemoryNode::new("iframe").frame([button("pay", "Pay now")]),
    ]);
    let mut config = config();
    let req = SearchRequest::text("Pay now", &config);
    Finder::new(&browser, &config)
        .perform(&req, &Action::Click)
        .await
        .unwrap();
    let clicks = browser.clicks().await;
    assert!(matches!(&clicks[..], [MemoryEvent::Click { id: Some(id), .. }] if id == "pay"));

    config.search_frames = false;
    assert!(Finder::new(&browser, &config)
        .resolve(&req)
        .await
        .unwrap_err()
        .is_timeout());
}

#[tokio::test(start_paused = true)]
async fn inputs_are_typed_into_by_label() {
    let browser = MemoryBrowser::new(vec![MemoryNode::new("form").children([
        MemoryNode::new("label").attr("for", "user").text("Username"),
        MemoryNode::new("input").id("user"),
    ])]);
    let config = config();
    let req = SearchRequest::input("Username", &config);
    let action = Action::TypeText {
        text: "alice".into(),
        clear: true,
        check: true,
    };
    Finder::new(&browser, &config)
        .perform(&req, &action)
        .await
        .unwrap();
    assert_eq!(browser.value_of("user").await.as_deref(), Some("alice"));
}

#[tokio::test(start_paused = true)]
async fn absence_waits_for_removal() {
    let browser = MemoryBrowser::new(vec![MemoryNode::new("div").id("spinner").text("Loading")]);
    let config = config();
    let finder = Finder::new(&browser, &config);
    let req = SearchRequest::text("Loading", &config);
    let finish = async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        browser.remove("spinner").await;
    };
    let (gone, ()) = tokio::join!(finder.expect_absent(&req), finish);
    gone.unwrap();
}

#[tokio::test(start_paused = true)]
async fn first_present_reports_the_matching_index() {
    let browser = MemoryBrowser::new(vec![MemoryNode::new("p").text("Welcome back")]);
    let config = config();
    let reqs = vec![
        SearchRequest::text("Sign in", &config),
        SearchRequest::text("Welcome", &config),
    ];
    assert_eq!(
        Finder::new(&browser, &config)
            .first_present(&reqs)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn blank_locators_fail_fast() {
    let browser = MemoryBrowser::new(Vec::new());
    let config = config();
    let req = SearchRequest::text("   ", &config);
    let failure = Finder::new(&browser, &config).resolve(&req).await.unwrap_err();
    assert!(matches!(failure.error, FindError::InvalidLocator(_)));
    assert!(!failure.is_timeout());
}
