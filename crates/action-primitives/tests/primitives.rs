use std::sync::Arc;
use std::time::Duration;

use action_locator::SelectorCatalog;
use action_primitives::{
    capture, click_first, find_now, type_human, wait_absent, wait_for_any, wait_for_url_change,
    DelayRange, InstantPacer, RunCtx, Timing,
};
use cdp_adapter::stub::{Effect, FakeElement, ScriptedPage};
use cdp_adapter::AnchorDescriptor;
use formpilot_core_types::UserId;

fn ctx(page: Arc<ScriptedPage>, pacer: Arc<InstantPacer>) -> RunCtx {
    RunCtx::builder(
        UserId::new("u1"),
        page,
        Arc::new(SelectorCatalog::embedded().unwrap()),
    )
    .pacer(pacer)
    .timing(Timing {
        poll_interval_ms: 100,
        ..Timing::default()
    })
    .build()
}

#[tokio::test]
async fn wait_reports_which_alternative_matched() {
    let page = Arc::new(ScriptedPage::new("https://w.test/a"));
    page.add(FakeElement::button("save").anchors(["text=:Save"]));
    let ctx = ctx(page, Arc::new(InstantPacer::new()));

    let anchors = vec![
        AnchorDescriptor::css("#missing"),
        AnchorDescriptor::exact_text("Save"),
    ];
    let found = wait_for_any(&ctx, &anchors, Duration::from_secs(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.index, 1);
    assert_eq!(found.element.label, "save");
}

#[tokio::test]
async fn not_found_is_a_value_and_counts_polls() {
    let page = Arc::new(ScriptedPage::new("https://w.test/a"));
    let pacer = Arc::new(InstantPacer::new());
    let ctx = ctx(page, pacer.clone());

    let found = wait_for_any(&ctx, &[AnchorDescriptor::css("#nope")], Duration::from_millis(1_000))
        .await
        .unwrap();
    assert!(found.is_none());
    // ten polls at 100ms, sleeping between them
    assert_eq!(pacer.sleeps().len(), 9);
    assert!(wait_for_any(&ctx, &[], Duration::from_secs(5)).await.unwrap().is_none());
}

#[tokio::test]
async fn click_first_then_wait_for_navigation() {
    let page = Arc::new(ScriptedPage::new("https://w.test/a"));
    page.add(
        FakeElement::button("next")
            .anchors(["aria:button=Next"])
            .on_url("/a")
            .on_click(Effect::Navigate("https://w.test/b".into())),
    );
    let ctx = ctx(page.clone(), Arc::new(InstantPacer::new()));

    let anchors = vec![AnchorDescriptor::aria("button", "Next")];
    assert!(click_first(&ctx, &anchors, Duration::from_secs(1))
        .await
        .unwrap()
        .is_some());
    let moved = wait_for_url_change(&ctx, "https://w.test/a", Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(moved.as_deref(), Some("https://w.test/b"));
    assert!(wait_absent(&ctx, &anchors, Duration::from_secs(1)).await.unwrap());
    assert!(find_now(&ctx, &anchors).await.unwrap().is_none());
}

#[tokio::test]
async fn typing_is_per_character() {
    let page = Arc::new(ScriptedPage::new("https://w.test/a"));
    page.add(FakeElement::text_input("name").anchors(["css:#name"]));
    let pacer = Arc::new(InstantPacer::new());
    let ctx = ctx(page.clone(), pacer.clone());

    let field = find_now(&ctx, &[AnchorDescriptor::css("#name")])
        .await
        .unwrap()
        .unwrap();
    type_human(&ctx, &field.element, "Zoë", DelayRange::new(1, 2))
        .await
        .unwrap();

    let log = page.log();
    assert_eq!(log.typed.len(), 3);
    assert_eq!(log.typed_into("name"), "Zoë");
    assert_eq!(pacer.pauses(), 4);
    assert_eq!(page.element("name").unwrap().value, "Zoë");
}

#[tokio::test]
async fn screenshot_failure_never_fails_the_caller() {
    let page = Arc::new(ScriptedPage::new("https://w.test/a"));
    page.fail_screenshots(true);
    let ctx = ctx(page.clone(), Arc::new(InstantPacer::new()));

    assert_eq!(capture(&ctx, "broken").await, "");
    page.fail_screenshots(false);
    assert_eq!(capture(&ctx, "fine").await, "memory:fine");

    let shots = ctx.screenshots();
    assert_eq!(shots.keys().collect::<Vec<_>>(), vec!["broken", "fine"]);
    assert_eq!(shots["broken"], "");
}
