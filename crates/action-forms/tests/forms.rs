use std::sync::Arc;
use std::time::Duration;

use action_forms::{
    choose_typeahead, close_modal, ensure_checked, fill_and_verify, fill_optional, fill_password,
    open_modal, save_modal, select_dropdown, select_with_verification, upload_file, ModalSpec,
    TypeaheadMode,
};
use action_locator::SelectorCatalog;
use action_primitives::{InstantPacer, OutcomeStatus, RunCtx, Timing};
use cdp_adapter::stub::{Effect, FakeElement, ScriptedPage};
use cdp_adapter::{AnchorDescriptor, ClearMethod, ForcedState};
use formpilot_core_types::UserId;

const URL: &str = "https://www.freelance-market.test/nx/create-profile/employment";

fn ctx(page: Arc<ScriptedPage>, pacer: Arc<InstantPacer>) -> RunCtx {
    RunCtx::builder(
        UserId::new("u1"),
        page,
        Arc::new(SelectorCatalog::embedded().unwrap()),
    )
    .pacer(pacer)
    .timing(Timing {
        poll_interval_ms: 100,
        selector_timeout_ms: 1_000,
        long_timeout_ms: 2_000,
        ..Timing::default()
    })
    .build()
}

fn setup() -> (Arc<ScriptedPage>, Arc<InstantPacer>, RunCtx) {
    let page = Arc::new(ScriptedPage::new(URL));
    let pacer = Arc::new(InstantPacer::new());
    let ctx = ctx(page.clone(), pacer.clone());
    (page, pacer, ctx)
}

#[tokio::test]
async fn fill_types_blurs_and_verifies() {
    let (page, _, ctx) = setup();
    page.add(FakeElement::text_input("first").anchors(["css:#first-name-input"]));

    let outcome = fill_and_verify(&ctx, "account.first_name", "Ada", "account")
        .await
        .unwrap();
    assert!(outcome.is_success());
    assert_eq!(page.element("first").unwrap().value, "Ada");
    assert_eq!(page.log().keys, vec!["Tab"]);
}

#[tokio::test]
async fn fill_never_accepts_an_empty_value() {
    let (page, _, ctx) = setup();
    page.add(FakeElement::text_input("first").anchors(["css:#first-name-input"]));

    let outcome = fill_and_verify(&ctx, "account.first_name", "  ", "account")
        .await
        .unwrap();
    assert_eq!(outcome.status(), OutcomeStatus::SoftFail);
    assert_eq!(outcome.error_code(), Some("FIRST_NAME_FILL_FAILED"));
    assert!(page.log().typed.is_empty());

    let skipped = fill_optional(&ctx, "account.first_name", "", "account")
        .await
        .unwrap();
    assert!(skipped.is_success());
}

#[tokio::test]
async fn fill_reports_a_missing_field() {
    let (_, _, ctx) = setup();
    let outcome = fill_and_verify(&ctx, "account.first_name", "Ada", "account")
        .await
        .unwrap();
    assert_eq!(outcome.error_code(), Some("FIRST_NAME_FIELD_NOT_FOUND"));
}

#[tokio::test]
async fn fill_falls_back_to_leniency_after_the_retry_budget() {
    let (page, pacer, ctx) = setup();
    page.add(
        FakeElement::text_input("city")
            .anchors(["css:input[aria-labelledby=\"city-label\"]"])
            .sticky_value("Munich (Bavaria)"),
    );

    let outcome = fill_and_verify(&ctx, "location.city", "Berlin", "location")
        .await
        .unwrap();
    assert!(outcome.is_success());
    assert_eq!(page.log().typed_into("city"), "Berlin".repeat(3));
    assert_eq!(
        pacer.sleeps(),
        vec![Duration::from_millis(500), Duration::from_millis(1_000)]
    );
}

#[tokio::test]
async fn password_clears_residue_by_script_and_reads_back_exactly() {
    let (page, _, ctx) = setup();
    page.add(
        FakeElement::text_input("pw")
            .input_type("password")
            .anchors(["css:#password-input"])
            .value("stale")
            .ignore_keyboard_clear(),
    );

    let outcome = fill_password(&ctx, "account.password", "s3cret!pw", "account")
        .await
        .unwrap();
    assert!(outcome.is_success());
    assert_eq!(page.element("pw").unwrap().value, "s3cret!pw");
    let clears = page.log().clears;
    assert!(clears.contains(&("pw".to_string(), ClearMethod::Script)));
}

#[tokio::test]
async fn password_skips_a_match_that_is_not_a_password_input() {
    let (page, _, ctx) = setup();
    page.add(FakeElement::text_input("username").anchors(["css:#password-input"]));
    page.add(
        FakeElement::new("real", "input")
            .input_type("password")
            .anchors(["css:input[type=\"password\"]"]),
    );

    let outcome = fill_password(&ctx, "account.password", "hunter22", "account")
        .await
        .unwrap();
    assert!(outcome.is_success());
    let log = page.log();
    assert_eq!(log.typed_into("real"), "hunter22");
    assert_eq!(log.typed_into("username"), "");
}

#[tokio::test]
async fn password_failure_evidence_carries_lengths_only() {
    let (page, _, ctx) = setup();
    page.add(
        FakeElement::new("pw", "input")
            .input_type("password")
            .anchors(["css:#password-input"])
            .read_only(),
    );

    let password = "s3cret!pw";
    let outcome = fill_password(&ctx, "account.password", password, "account")
        .await
        .unwrap();
    assert_eq!(outcome.error_code(), Some("PASSWORD_FILL_FAILED"));
    let evidence = outcome.evidence().unwrap();
    assert!(!evidence.contains(password));
    assert!(evidence.contains("expected 9 characters"));
    let json = serde_json::to_string(&outcome).unwrap();
    assert!(!json.contains(password));
}

#[tokio::test]
async fn checkbox_survives_a_dropped_click() {
    let (page, _, ctx) = setup();
    page.add(
        FakeElement::checkbox("terms")
            .anchors(["css:#checkbox-terms"])
            .drop_clicks(1),
    );

    let anchors = ctx.catalog().field("account.terms");
    let outcome = ensure_checked(&ctx, &anchors, "terms", "account").await.unwrap();
    assert!(outcome.is_success());
    assert_eq!(page.log().clicks_on("terms"), 2);
    assert!(page.element("terms").unwrap().checked);
}

#[tokio::test]
async fn checkbox_gives_up_after_two_clicks() {
    let (page, _, ctx) = setup();
    page.add(
        FakeElement::checkbox("terms")
            .anchors(["css:#checkbox-terms"])
            .drop_clicks(5),
    );

    let anchors = ctx.catalog().field("account.terms");
    let outcome = ensure_checked(&ctx, &anchors, "terms", "account").await.unwrap();
    assert_eq!(outcome.error_code(), Some("TERMS_CHECKBOX_FAILED"));
    assert_eq!(page.log().clicks_on("terms"), 2);
}

#[tokio::test]
async fn already_checked_box_is_left_alone() {
    let (page, _, ctx) = setup();
    page.add(FakeElement::checkbox("terms").anchors(["css:#checkbox-terms"]).checked(true));

    let anchors = ctx.catalog().field("account.terms");
    let outcome = ensure_checked(&ctx, &anchors, "terms", "account").await.unwrap();
    assert!(outcome.is_success());
    assert_eq!(page.log().clicks_on("terms"), 0);
}

#[tokio::test]
async fn selection_forces_state_when_clicks_are_dropped() {
    let (page, _, ctx) = setup();
    page.add(FakeElement::radio("level").anchors(["css:#level"]).drop_clicks(2));

    let anchors = vec![AnchorDescriptor::css("#level")];
    let outcome = select_with_verification(&ctx, &anchors, "level", "experience")
        .await
        .unwrap();
    assert!(outcome.is_success());
    assert_eq!(
        page.log().forced,
        vec![("level".to_string(), ForcedState::Checked(true))]
    );
}

#[tokio::test]
async fn selection_fails_when_nothing_sticks() {
    let (page, _, ctx) = setup();
    page.add(
        FakeElement::radio("level")
            .anchors(["css:#level"])
            .drop_clicks(2)
            .ignore_forced_state(),
    );

    let anchors = vec![AnchorDescriptor::css("#level")];
    let outcome = select_with_verification(&ctx, &anchors, "level", "experience")
        .await
        .unwrap();
    assert_eq!(outcome.error_code(), Some("LEVEL_SELECTION_FAILED"));
}

#[tokio::test]
async fn dropdown_picks_the_searched_option() {
    let (page, _, ctx) = setup();
    page.add(
        FakeElement::button("country")
            .anchors(["aria:combobox=Country"])
            .text("Select country")
            .on_click(Effect::Show("search".into()))
            .on_click(Effect::Show("opt-de".into())),
    );
    page.add(
        FakeElement::text_input("search")
            .anchors(["css:input[placeholder=\"Search\"]"])
            .hidden(),
    );
    page.add(
        FakeElement::new("opt-de", "li")
            .text("Germany")
            .hidden()
            .on_click(Effect::SetText {
                key: "country".into(),
                text: "Germany".into(),
            })
            .on_click(Effect::Hide("opt-de".into())),
    );

    let outcome = select_dropdown(
        &ctx,
        "account.country",
        Some("account.country_search"),
        "Germany",
        "account",
    )
    .await
    .unwrap();
    assert!(outcome.is_success());
    let log = page.log();
    assert_eq!(log.typed_into("search"), "Germany");
    assert_eq!(log.clicks_on("opt-de"), 1);
    assert!(log.keys.is_empty());
}

#[tokio::test]
async fn dropdown_falls_back_to_keyboard_selection() {
    let (page, _, ctx) = setup();
    page.add(
        FakeElement::button("country")
            .anchors(["aria:combobox=Country"])
            .text("Select country"),
    );
    page.on_key(
        None,
        "Enter",
        vec![Effect::SetText {
            key: "country".into(),
            text: "Germany".into(),
        }],
    );

    let outcome = select_dropdown(&ctx, "account.country", None, "Germany", "account")
        .await
        .unwrap();
    assert!(outcome.is_success());
    assert_eq!(page.log().keys, vec!["ArrowDown", "Enter"]);
}

#[tokio::test]
async fn dropdown_without_a_match_reports_option_not_found() {
    let (page, _, ctx) = setup();
    page.add(
        FakeElement::button("country")
            .anchors(["aria:combobox=Country"])
            .text("Select country"),
    );

    let outcome = select_dropdown(&ctx, "account.country", None, "Atlantis", "account")
        .await
        .unwrap();
    assert_eq!(outcome.error_code(), Some("COUNTRY_OPTION_NOT_FOUND"));
    assert_eq!(page.log().clicks_on("country"), 3);
}

fn skills_typeahead(page: &ScriptedPage, chip: bool) {
    let mut suggestion = FakeElement::new("sugg", "li")
        .text("Rust")
        .hidden()
        .on_click(Effect::SetValue {
            key: "skills".into(),
            value: String::new(),
        })
        .on_click(Effect::Hide("sugg".into()));
    if chip {
        suggestion = suggestion.on_click(Effect::Show("chip".into()));
    }
    page.add(
        FakeElement::text_input("skills")
            .anchors(["aria:combobox=Skills"])
            .on_type(Effect::Show("sugg".into())),
    )
    .add(suggestion)
    .add(
        FakeElement::new("chip", "span")
            .anchors([r#"css:[data-test="token"][title="Rust"]"#])
            .hidden(),
    );
}

#[tokio::test]
async fn typeahead_chip_pick_empties_the_input_and_leaves_a_chip() {
    let (page, _, ctx) = setup();
    skills_typeahead(&page, true);

    let outcome = choose_typeahead(&ctx, "skills.input", "Rust", TypeaheadMode::Chip, "skills")
        .await
        .unwrap();
    assert!(outcome.is_success(), "{outcome:?}");
    assert_eq!(page.log().clicks_on("sugg"), 1);
    assert!(page.log().keys.is_empty());
}

#[tokio::test]
async fn emptied_input_without_a_chip_is_not_a_pick() {
    let (page, _, ctx) = setup();
    skills_typeahead(&page, false);

    let outcome = choose_typeahead(&ctx, "skills.input", "Rust", TypeaheadMode::Chip, "skills")
        .await
        .unwrap();
    assert_eq!(outcome.error_code(), Some("INPUT_SELECTION_FAILED"));
    assert_eq!(page.log().clicks_on("sugg"), 3);
    assert!(page.log().forced.is_empty());
}

#[tokio::test]
async fn typeahead_single_pick_keeps_the_value() {
    let (page, _, ctx) = setup();
    page.add(FakeElement::text_input("city").anchors(["aria:combobox=City"]));

    let outcome = choose_typeahead(&ctx, "location.city", "Berlin", TypeaheadMode::Single, "location")
        .await
        .unwrap();
    assert!(outcome.is_success());
    assert_eq!(page.log().keys, vec!["Enter"]);
    assert!(page.log().forced.is_empty());
}

#[tokio::test]
async fn typeahead_single_value_is_forced_when_nothing_sticks() {
    let (page, _, ctx) = setup();
    page.add(
        FakeElement::text_input("city")
            .anchors(["aria:combobox=City"])
            .read_only(),
    );

    let outcome = choose_typeahead(&ctx, "location.city", "Berlin", TypeaheadMode::Single, "location")
        .await
        .unwrap();
    assert!(outcome.is_success(), "{outcome:?}");
    assert_eq!(page.element("city").unwrap().value, "Berlin");
    assert_eq!(
        page.log().forced,
        vec![("city".to_string(), ForcedState::Value("Berlin".into()))]
    );
}

#[tokio::test]
async fn typeahead_single_fails_when_forcing_does_not_stick() {
    let (page, _, ctx) = setup();
    page.add(
        FakeElement::text_input("city")
            .anchors(["aria:combobox=City"])
            .read_only()
            .ignore_forced_state(),
    );

    let outcome = choose_typeahead(&ctx, "location.city", "Berlin", TypeaheadMode::Single, "location")
        .await
        .unwrap();
    assert_eq!(outcome.error_code(), Some("CITY_SELECTION_FAILED"));
    assert_eq!(page.log().keys.len(), 3);
}

#[tokio::test]
async fn upload_of_a_missing_file_fails_before_touching_the_page() {
    let (page, _, ctx) = setup();
    let missing = std::path::Path::new("/definitely/not/here.pdf");
    let outcome = upload_file(&ctx, None, "resume_import.file_input", missing, "resume", "resume_import")
        .await
        .unwrap();
    assert_eq!(outcome.error_code(), Some("RESUME_UPLOAD_FAILED"));
    assert!(page.log().uploads.is_empty());
}

#[tokio::test]
async fn upload_keeps_the_rejection_message() {
    let (page, _, ctx) = setup();
    let dir = tempfile::tempdir().unwrap();
    let resume = dir.path().join("cv.pdf");
    std::fs::write(&resume, b"%PDF-1.4").unwrap();
    page.add(
        FakeElement::file_input("file")
            .anchors(["css:input[type=\"file\"]"])
            .hidden()
            .upload_error("file exceeds 10MB"),
    );

    let outcome = upload_file(&ctx, None, "resume_import.file_input", &resume, "resume", "resume_import")
        .await
        .unwrap();
    assert_eq!(outcome.error_code(), Some("RESUME_UPLOAD_FAILED"));
    assert!(outcome.evidence().unwrap().contains("file exceeds 10MB"));
}

#[tokio::test]
async fn upload_reaches_hidden_inputs_behind_a_trigger() {
    let (page, _, ctx) = setup();
    let dir = tempfile::tempdir().unwrap();
    let resume = dir.path().join("cv.pdf");
    std::fs::write(&resume, b"%PDF-1.4").unwrap();
    page.add(FakeElement::button("upload-btn").anchors(["text=:Upload your resume"]));
    page.add(
        FakeElement::file_input("file")
            .anchors(["css:input[type=\"file\"]"])
            .hidden(),
    );

    let outcome = upload_file(
        &ctx,
        Some("resume_import.upload_trigger"),
        "resume_import.file_input",
        &resume,
        "resume",
        "resume_import",
    )
    .await
    .unwrap();
    assert!(outcome.is_success());
    let log = page.log();
    assert_eq!(log.clicks_on("upload-btn"), 1);
    assert_eq!(log.uploads, vec![("file".to_string(), resume)]);
}

fn employment_modal(page: &ScriptedPage) {
    page.add(
        FakeElement::button("add")
            .anchors(["css:button[data-qa=\"employment-add-btn\"]"])
            .on_click(Effect::Show("dialog".into()))
            .on_click(Effect::Show("heading".into())),
    );
    page.add(FakeElement::new("dialog", "div").anchors(["aria:dialog"]).hidden());
    page.add(FakeElement::new("heading", "h2").text("Add work experience").hidden());
}

const EMPLOYMENT: ModalSpec<'static> = ModalSpec {
    name: "employment",
    trigger_key: "employment.add",
    title_key: Some("employment.modal_title"),
};

#[tokio::test]
async fn modal_opens_and_closes_with_the_close_button() {
    let (page, _, ctx) = setup();
    employment_modal(&page);
    page.add(
        FakeElement::button("close")
            .anchors(["aria:button=Close"])
            .on_click(Effect::Hide("dialog".into()))
            .on_click(Effect::Hide("heading".into())),
    );

    assert!(open_modal(&ctx, EMPLOYMENT, "employment").await.unwrap().is_success());
    assert!(close_modal(&ctx, EMPLOYMENT, "employment").await.unwrap().is_success());
    assert!(page.log().keys.is_empty());
}

#[tokio::test]
async fn modal_close_falls_back_to_escape() {
    let (page, _, ctx) = setup();
    employment_modal(&page);
    page.on_key(None, "Escape", vec![Effect::Hide("dialog".into())]);

    assert!(open_modal(&ctx, EMPLOYMENT, "employment").await.unwrap().is_success());
    assert!(close_modal(&ctx, EMPLOYMENT, "employment").await.unwrap().is_success());
    assert_eq!(page.log().keys, vec!["Escape"]);
}

#[tokio::test]
async fn modal_save_dismisses_the_dialog() {
    let (page, _, ctx) = setup();
    employment_modal(&page);
    page.add(
        FakeElement::button("save")
            .anchors(["aria:button=Save"])
            .on_click(Effect::Hide("dialog".into())),
    );

    assert!(open_modal(&ctx, EMPLOYMENT, "employment").await.unwrap().is_success());
    assert!(save_modal(&ctx, EMPLOYMENT, "employment").await.unwrap().is_success());
    assert_eq!(page.log().clicks_on("save"), 1);
}

#[tokio::test]
async fn modal_that_never_opens_is_reported_per_name() {
    let (page, pacer, ctx) = setup();
    page.add(FakeElement::button("add").anchors(["css:button[data-qa=\"employment-add-btn\"]"]));

    let outcome = open_modal(&ctx, EMPLOYMENT, "employment").await.unwrap();
    assert_eq!(outcome.error_code(), Some("EMPLOYMENT_MODAL_NOT_OPENED"));
    assert_eq!(page.log().clicks_on("add"), 3);
    assert!(pacer.sleeps().contains(&Duration::from_millis(1_000)));
}
