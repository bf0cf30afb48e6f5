mod common;

use common::{session_with, settings, MemoryLauncher};
use std::sync::Arc;
use std::time::Duration;
use veriweb_drivers::memory::{MemoryBrowser, MemoryEvent, MemoryNode};
use veriweb_drivers::veriweb_browser::options::BrowserKind;
use veriweb_drivers::{Browser, DriverError};
use veriweb_finder::FindError;
use veriweb_http::LinkError;
use veriweb_keywords::{KeywordError, KeywordOptions, Session};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn opts() -> KeywordOptions {
    KeywordOptions::default()
}

fn clicked_ids(events: &[MemoryEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            MemoryEvent::Click { id, .. } => id.clone(),
            _ => None,
        })
        .collect()
}

fn people_table() -> Arc<MemoryBrowser> {
    let row = |n: usize, name: &str| {
        MemoryNode::new("tr").children([
            MemoryNode::new("td").text(name),
            MemoryNode::new("td").child(MemoryNode::new("button").id(&format!("edit-{n}")).text("Edit")),
        ])
    };
    Arc::new(MemoryBrowser::new(vec![MemoryNode::new("table").children([
        row(1, "Alice"),
        row(2, "Bob"),
        row(3, "Carol"),
    ])]))
}

fn sign_up_form() -> Arc<MemoryBrowser> {
    Arc::new(MemoryBrowser::new(vec![MemoryNode::new("form").children([
        MemoryNode::new("input").id("email").attr("placeholder", "Email"),
        MemoryNode::new("label").attr("for", "name").text("Name"),
        MemoryNode::new("input").id("name").attr("value", "Ann"),
        MemoryNode::new("input").id("code").attr("aria-label", "Code").attr("disabled", ""),
        MemoryNode::new("button").id("settings").attr("title", "Settings"),
    ])]))
}

#[tokio::test(start_paused = true)]
async fn shadow_search_follows_session_config() {
    let browser = Arc::new(MemoryBrowser::new(vec![
        MemoryNode::new("span").text("Total"),
        MemoryNode::new("x-summary").shadow([MemoryNode::new("span").text("Total")]),
        MemoryNode::new("x-card").shadow([MemoryNode::new("p").text("Hidden gem")]),
    ]));
    let mut session = session_with(browser, settings()).await;

    assert!(session.verify_text("Hidden gem", &opts()).await.is_err());
    assert_eq!(session.get_text_count("Total", &opts()).await.unwrap(), 1);

    assert_eq!(session.set_config("ShadowDOM", "on").unwrap(), "false");
    session.verify_text("Hidden gem", &opts()).await.unwrap();
    assert_eq!(session.get_text_count("Total", &opts()).await.unwrap(), 2);
    session.verify_text_count("Total", 2, &opts()).await.unwrap();

    assert_eq!(session.reset_config(Some("shadow dom")).unwrap().as_deref(), Some("true"));
    assert!(!session.config().shadow_dom);
}

#[tokio::test(start_paused = true)]
async fn reset_restores_session_starting_values() {
    let mut start = settings();
    start.search.partial_match = false;
    let mut session = session_with(Arc::new(MemoryBrowser::new(Vec::new())), start).await;

    session.set_config("PartialMatch", "yes").unwrap();
    session.set_config("Timeout", "3s").unwrap();
    assert_eq!(session.reset_config(None).unwrap(), None);
    assert!(!session.config().partial_match);
    assert_eq!(session.config().default_timeout, Duration::from_millis(500));

    assert!(matches!(
        session.set_config("Sparkles", "on"),
        Err(KeywordError::Config(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn click_text_uses_anchor() {
    let browser = people_table();
    let session = session_with(browser.clone(), settings()).await;

    session.click_text("Edit", &opts().anchor("Bob")).await.unwrap();
    session.click_text("Edit", &opts().anchor("3")).await.unwrap();
    session.click_text("Edit", &opts()).await.unwrap();
    assert_eq!(clicked_ids(&browser.events().await), ["edit-2", "edit-3", "edit-1"]);

    let strict = session.click_text("Edit", &opts().strict(true)).await.unwrap_err();
    assert!(matches!(
        strict.search().map(|f| f.error.root()),
        Some(FindError::AmbiguousMatch { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn input_keywords_round_trip_through_the_form() {
    let browser = sign_up_form();
    let session = session_with(browser.clone(), settings()).await;

    session
        .type_text("Email", "ann@example.com", &opts().check(true))
        .await
        .unwrap();
    assert_eq!(browser.value_of("email").await.as_deref(), Some("ann@example.com"));
    assert_eq!(session.get_input_value("Email", &opts()).await.unwrap(), "ann@example.com");

    session.verify_input_element("Name", &opts()).await.unwrap();
    session
        .verify_input_values(&[("Email", "ann@example.com"), ("Name", "Ann")], &opts())
        .await
        .unwrap();
    session.verify_input_status("Code", "disabled", &opts()).await.unwrap();

    let mismatch = session
        .verify_input_value("Name", "Bob", &opts().timeout(Duration::from_millis(300)))
        .await
        .unwrap_err();
    assert!(mismatch.search().is_some_and(|f| f.is_timeout()));

    assert!(matches!(
        session.verify_input_status("Code", "wobbly", &opts()).await,
        Err(KeywordError::InvalidArgument(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn click_item_matches_attributes() {
    let browser = sign_up_form();
    let session = session_with(browser.clone(), settings()).await;

    session.verify_item("Settings", &opts()).await.unwrap();
    session.click_item("Settings", &opts()).await.unwrap();
    assert_eq!(clicked_ids(&browser.events().await), ["settings"]);
}

#[tokio::test(start_paused = true)]
async fn verify_any_and_all() {
    let browser = Arc::new(MemoryBrowser::new(vec![MemoryNode::new("h1").text("Welcome back")]));
    let session = session_with(browser, settings()).await;

    let found = session.verify_any(&["Sign in", "Welcome back"], &opts()).await.unwrap();
    assert_eq!(found, "Welcome back");

    session.verify_all(&["Welcome"], &opts()).await.unwrap();
    let missing = session
        .verify_all(&["Welcome back", "Sign in"], &opts())
        .await
        .unwrap_err();
    let failure = missing.search().unwrap();
    assert!(failure.is_timeout());
    assert_eq!(failure.diagnostics.target, "Sign in");
}

#[tokio::test(start_paused = true)]
async fn verify_no_text_waits_for_removal() {
    let browser = Arc::new(MemoryBrowser::new(vec![
        MemoryNode::new("div").id("spinner").text("Loading"),
        MemoryNode::new("p").text("Report"),
    ]));
    let session = session_with(browser.clone(), settings()).await;

    let wait_opts = opts();
    let (result, removed) = tokio::join!(session.verify_no_text("Loading", &wait_opts), async {
        tokio::time::sleep(Duration::from_millis(250)).await;
        browser.remove("spinner").await
    });
    assert!(removed);
    result.unwrap();
    assert!(session.verify_no_text("Report", &opts()).await.is_err());
}

#[tokio::test]
async fn failed_keyword_saves_screenshot() {
    let dir = tempfile::tempdir().unwrap();
    let mut with_shots = settings();
    with_shots.screenshots = Some(dir.path().join("shots"));
    let session = session_with(Arc::new(MemoryBrowser::new(Vec::new())), with_shots).await;

    let err = session
        .verify_text("Missing", &opts().timeout(Duration::from_millis(150)))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Missing"));

    let shots: Vec<_> = std::fs::read_dir(dir.path().join("shots"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(shots.len(), 1);
    assert!(shots[0].starts_with("verify_text_"));
    assert!(shots[0].ends_with(".png"));
}

#[tokio::test(start_paused = true)]
async fn browser_lifecycle() {
    common::init_test_tracing();
    let first = Arc::new(
        MemoryBrowser::named("first", Vec::new())
            .with_page("https://app.test/login", vec![MemoryNode::new("h1").text("Log in")]),
    );
    let second = Arc::new(MemoryBrowser::named("second", Vec::new()));
    let launcher = MemoryLauncher::new([first.clone(), second.clone()]);
    let mut session = Session::new(settings(), launcher.clone());

    assert_eq!(
        session
            .open_browser("https://app.test/login", Some("ff"), "--kiosk, --private")
            .await
            .unwrap(),
        1
    );
    session.verify_text("Log in", &opts()).await.unwrap();
    assert_eq!(session.open_browser("", None, "").await.unwrap(), 2);
    {
        let launched = launcher.launched.lock().unwrap();
        assert_eq!(launched[0].kind, BrowserKind::Firefox);
        assert!(launched[0].args.iter().any(|a| a == "--kiosk"));
        assert_eq!(launched[1].kind, BrowserKind::Chrome);
    }

    assert_eq!(session.return_browser().unwrap().name(), "second");
    session.switch_browser("1").await.unwrap();
    assert_eq!(session.return_browser().unwrap().name(), "first");
    assert!(session.switch_browser("7").await.is_err());

    session.close_browser().await.unwrap();
    assert!(first.events().await.contains(&MemoryEvent::Close));
    assert_eq!(session.return_browser().unwrap().name(), "second");

    session.go_to("https://app.test/next").await.unwrap();
    assert_eq!(second.current_url().await.unwrap(), "https://app.test/next");

    session.close_all_browsers().await.unwrap();
    assert_eq!(session.browser_count(), 0);
    assert!(second.events().await.contains(&MemoryEvent::Close));
    assert!(matches!(
        session.verify_text("Log in", &opts()).await,
        Err(KeywordError::Driver(DriverError::SessionClosed(_)))
    ));
}

#[tokio::test]
async fn unknown_browser_alias_is_rejected() {
    let mut session = Session::new(settings(), MemoryLauncher::new(Vec::new()));
    assert!(matches!(
        session.open_browser("", Some("netscape"), "").await,
        Err(KeywordError::Driver(DriverError::InvalidOptions(_)))
    ));
    assert_eq!(session.browser_count(), 0);
}

#[tokio::test]
async fn verify_links_reports_broken_links() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let page = format!("{}/index.html", server.uri());
    let link = |href: &str| MemoryNode::new("a").attr("href", href).text(href);
    let browser = Arc::new(MemoryBrowser::new(Vec::new()).with_page(
        &page,
        vec![
            link("/ok"),
            link("/missing"),
            link("/ok#details"),
            link("mailto:team@example.com"),
            link("#top"),
        ],
    ));
    let session = session_with(browser, settings()).await;

    let err = session.verify_links(&page, true, false).await.unwrap_err();
    let broken = match err {
        KeywordError::Links(LinkError::Broken(broken)) => broken,
        other => panic!("expected broken links, got {other:?}"),
    };
    assert_eq!(broken.len(), 1);
    assert_eq!(broken[0].url.path(), "/missing");
}

#[tokio::test]
async fn verify_links_on_page_without_links_passes() {
    let session = session_with(Arc::new(MemoryBrowser::new(Vec::new())), settings()).await;
    let reports = session.verify_links("current", false, true).await.unwrap();
    assert!(reports.is_empty());
}
