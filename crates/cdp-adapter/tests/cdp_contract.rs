//! Contract tests for `ChromiumPage` against a real Chromium binary. Ignored by
//! default because they need Chrome/Chromium on the host machine.

use std::env;
use std::time::Duration;

use cdp_adapter::{AnchorDescriptor, Cdp, CdpConfig, ChromiumPage, ClearMethod};

fn contract_enabled() -> bool {
    env::var("FORMPILOT_CDP_CONTRACT")
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

const FORM_PAGE: &str = "data:text/html,<html><body>\
<label for=email>Email</label><input id=email name=email>\
<button aria-label=Continue onclick=\"document.body.dataset.done='1'\">Continue</button>\
<p style=display:none>hidden copy</p>\
</body></html>";

#[tokio::test]
#[ignore = "requires Chrome/Chromium; set FORMPILOT_CDP_CONTRACT=1"]
async fn contract_resolves_types_and_reads_back() {
    if !contract_enabled() {
        eprintln!("skipping CDP contract test (FORMPILOT_CDP_CONTRACT not enabled)");
        return;
    }

    let page = ChromiumPage::launch(&CdpConfig::default())
        .await
        .expect("launch chromium");
    page.navigate(FORM_PAGE, Duration::from_secs(15))
        .await
        .expect("navigate succeeds");

    let email = page
        .query(&AnchorDescriptor::css("#email"))
        .await
        .expect("query")
        .expect("email field visible");
    page.focus(&email).await.expect("focus");
    page.type_text(&email, "a@b.test").await.expect("type");
    assert_eq!(page.element_state(&email).await.unwrap().value, "a@b.test");

    page.clear(&email, ClearMethod::Script).await.expect("clear");
    assert_eq!(page.element_state(&email).await.unwrap().value, "");

    let button = page
        .query(&AnchorDescriptor::aria("button", "Continue"))
        .await
        .expect("query")
        .expect("continue button");
    page.click(&button).await.expect("click");

    assert!(page
        .query(&AnchorDescriptor::text("hidden copy"))
        .await
        .expect("query")
        .is_none());
    assert!(!page.screenshot().await.expect("screenshot").is_empty());

    page.shutdown().await;
}

#[tokio::test]
#[ignore = "requires Chrome/Chromium; set FORMPILOT_CDP_CONTRACT=1"]
async fn contract_session_round_trips() {
    if !contract_enabled() {
        eprintln!("skipping CDP contract test (FORMPILOT_CDP_CONTRACT not enabled)");
        return;
    }

    let page = ChromiumPage::launch(&CdpConfig::default())
        .await
        .expect("launch chromium");
    page.navigate("https://example.com", Duration::from_secs(15))
        .await
        .expect("navigate succeeds");
    let blob = page.export_session().await.expect("export");
    page.restore_session(&blob).await.expect("restore");
    page.shutdown().await;
}
