//! Page surfaces driven against the in-memory site

mod support;

use portfolio_e2e::expect::expect;
use portfolio_e2e::model::{Framework, Section, Theme, ViewportPreset};
use portfolio_e2e::pages::{BasePage, CareerPage, ContactPage, DemosPage, ReportContent};
use portfolio_e2e::{BrowserPage, E2eError, SharedContext};
use support::{FakeProvider, SiteOptions};

fn page(options: SiteOptions, preset: ViewportPreset) -> (BrowserPage, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = support::test_config(dir.path());
    let provider = FakeProvider::new(options);
    let ctx: SharedContext = provider.context(config.viewport(preset));
    (BrowserPage::new(ctx, config), dir)
}

#[tokio::test]
async fn test_goto_resolves_against_base_url() {
    let (page, _dir) = page(SiteOptions::default(), ViewportPreset::Desktop);
    page.goto("./").await.unwrap();
    assert_eq!(page.url().await.unwrap(), "http://portfolio.test/");
}

#[tokio::test]
async fn test_theme_defaults_to_dark_and_toggles() {
    let (page, _dir) = page(SiteOptions::default(), ViewportPreset::Desktop);
    let base = BasePage::new(page);
    base.goto().await.unwrap();

    assert_eq!(base.theme().await.unwrap(), Theme::Dark);
    base.toggle_theme().await.unwrap();
    assert_eq!(base.theme().await.unwrap(), Theme::Light);
    base.toggle_theme().await.unwrap();
    assert_eq!(base.theme().await.unwrap(), Theme::Dark);
}

#[tokio::test]
async fn test_wait_for_theme_polls_through_transition() {
    let options = SiteOptions {
        theme_lag: 3,
        ..SiteOptions::default()
    };
    let (page, _dir) = page(options, ViewportPreset::Desktop);
    let base = BasePage::new(page);
    base.goto().await.unwrap();

    base.toggle_theme().await.unwrap();
    assert_eq!(base.theme().await.unwrap(), Theme::Dark);
    base.wait_for_theme(Theme::Light).await.unwrap();
}

#[tokio::test]
async fn test_navigation_moves_active_marker() {
    let (page, _dir) = page(SiteOptions::default(), ViewportPreset::Desktop);
    let base = BasePage::new(page);
    base.goto().await.unwrap();
    assert_eq!(base.active_section().await.unwrap(), Some(Section::Intro));

    for section in [Section::Career, Section::Demos, Section::Intro] {
        base.navigate_to(section).await.unwrap();
        base.wait_for_active_section(section).await.unwrap();
        expect(&base.section(section)).to_be_in_viewport().await.unwrap();
    }
}

#[tokio::test]
async fn test_contact_has_no_navigation_control() {
    let (page, _dir) = page(SiteOptions::default(), ViewportPreset::Desktop);
    let base = BasePage::new(page);
    base.goto().await.unwrap();

    let err = base.navigate_to(Section::Contact).await.unwrap_err();
    assert!(matches!(err, E2eError::ElementNotReady { .. }), "{}", err);
}

#[tokio::test]
async fn test_wait_for_active_section_reports_assertion() {
    let (page, _dir) = page(SiteOptions::default(), ViewportPreset::Desktop);
    let base = BasePage::new(page);
    base.goto().await.unwrap();

    let err = base.wait_for_active_section(Section::Demos).await.unwrap_err();
    assert!(matches!(err, E2eError::AssertionFailed(_)), "{}", err);
}

#[tokio::test]
async fn test_scrolling_to_contact_keeps_last_marker() {
    let (page, _dir) = page(SiteOptions::default(), ViewportPreset::Desktop);
    let base = BasePage::new(page);
    base.goto().await.unwrap();
    base.navigate_to(Section::Demos).await.unwrap();

    base.scroll_to(Section::Contact).await.unwrap();
    expect(&base.section(Section::Contact)).to_be_in_viewport().await.unwrap();
    assert_eq!(base.active_section().await.unwrap(), Some(Section::Demos));
}

#[tokio::test]
async fn test_back_to_top_only_after_scrolling() {
    let (page, _dir) = page(SiteOptions::default(), ViewportPreset::Desktop);
    let base = BasePage::new(page);
    base.goto().await.unwrap();

    expect(&base.back_to_top).to_be_hidden().await.unwrap();
    base.navigate_to(Section::Career).await.unwrap();
    expect(&base.back_to_top).to_be_visible().await.unwrap();
    base.back_to_top.click().await.unwrap();
    base.wait_for_active_section(Section::Intro).await.unwrap();
}

#[tokio::test]
async fn test_click_on_hidden_element_gives_up_after_action_timeout() {
    let (page, _dir) = page(SiteOptions::default(), ViewportPreset::Desktop);
    let base = BasePage::new(page);
    base.goto().await.unwrap();

    let err = base.back_to_top.click().await.unwrap_err();
    assert!(err.to_string().contains("testid=back-to-top"), "{}", err);
}

#[tokio::test]
async fn test_career_accordion_keeps_one_entry_open() {
    let (page, _dir) = page(SiteOptions::default(), ViewportPreset::Desktop);
    let career = CareerPage::new(page);
    career.goto().await.unwrap();

    assert_eq!(career.entry_count().await.unwrap(), support::CAREER_ENTRIES);
    assert_eq!(career.expanded_entries().await.unwrap(), vec![0]);

    career.expand(2).await.unwrap();
    assert_eq!(career.expanded_entries().await.unwrap(), vec![2]);
    expect(&career.detail(2)).to_be_visible().await.unwrap();
    expect(&career.detail(0)).to_be_hidden().await.unwrap();

    career.toggle_entry(2).await.unwrap();
    assert!(career.expanded_entries().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_expand_is_idempotent() {
    let (page, _dir) = page(SiteOptions::default(), ViewportPreset::Desktop);
    let career = CareerPage::new(page);
    career.goto().await.unwrap();

    career.expand(0).await.unwrap();
    career.expand(0).await.unwrap();
    assert_eq!(career.expanded_entries().await.unwrap(), vec![0]);
}

#[tokio::test]
async fn test_controlled_region_follows_aria_controls() {
    let (page, _dir) = page(SiteOptions::default(), ViewportPreset::Desktop);
    let career = CareerPage::new(page);
    career.goto().await.unwrap();
    career.expand(1).await.unwrap();

    let (id, region) = career.controlled_region(1).await.unwrap();
    assert_eq!(id, "detail-1");
    expect(&region).to_be_visible().await.unwrap();
}

#[tokio::test]
async fn test_career_table_headers_scope_to_table() {
    let (page, _dir) = page(SiteOptions::default(), ViewportPreset::Desktop);
    let career = CareerPage::new(page);
    career.goto().await.unwrap();

    let headers = career.table.locator("th");
    expect(&headers).to_have_count(4).await.unwrap();
    assert_eq!(headers.all().await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_report_viewer_shows_frame() {
    let (page, _dir) = page(SiteOptions::default(), ViewportPreset::Desktop);
    let demos = DemosPage::new(page);
    demos.goto().await.unwrap();
    demos.navigate_to(Section::Demos).await.unwrap();

    expect(&demos.report_viewer).to_be_hidden().await.unwrap();
    demos.open_report(Framework::RubyCucumber).await.unwrap();
    assert_eq!(demos.wait_for_report_content().await.unwrap(), ReportContent::Frame);
    assert_eq!(
        demos.iframe_src().await.unwrap().as_deref(),
        Some("https://nokillkenny.github.io/reports/ruby-cucumber/")
    );

    let sandbox = demos.iframe_sandbox().await.unwrap();
    assert!(sandbox.allows_scripts());
    assert!(sandbox.allows_same_origin());
    assert!(!sandbox.allows_forms());

    demos.close_report().await.unwrap();
    expect(&demos.report_viewer).to_be_hidden().await.unwrap();
}

#[tokio::test]
async fn test_report_viewer_fallback() {
    let options = SiteOptions {
        report_fallback: true,
        ..SiteOptions::default()
    };
    let (page, _dir) = page(options, ViewportPreset::Desktop);
    let demos = DemosPage::new(page);
    demos.goto().await.unwrap();

    demos.open_report(Framework::Playwright).await.unwrap();
    assert_eq!(demos.wait_for_report_content().await.unwrap(), ReportContent::Fallback);
}

#[tokio::test]
async fn test_report_content_missing_is_an_assertion() {
    let (page, _dir) = page(SiteOptions::default(), ViewportPreset::Desktop);
    let demos = DemosPage::new(page);
    demos.goto().await.unwrap();

    let err = demos.wait_for_report_content().await.unwrap_err();
    assert!(matches!(err, E2eError::AssertionFailed(_)), "{}", err);
}

#[tokio::test]
async fn test_repo_link_is_scoped_to_card() {
    let (page, _dir) = page(SiteOptions::default(), ViewportPreset::Desktop);
    let demos = DemosPage::new(page);
    demos.goto().await.unwrap();

    expect(&demos.framework_cards).to_have_count(3).await.unwrap();
    let href = demos.repo_link(Framework::Codeceptjs).attribute("href").await.unwrap();
    assert_eq!(href.as_deref(), Some("https://github.com/nokillkenny/codeceptjs-demo"));
}

#[tokio::test]
async fn test_contact_form_validation_and_toast() {
    let (page, _dir) = page(SiteOptions::default(), ViewportPreset::Desktop);
    let contact = ContactPage::new(page);
    contact.open().await.unwrap();

    contact.submit().await.unwrap();
    expect(&contact.name_input)
        .to_have_attribute("aria-invalid", "true")
        .await
        .unwrap();
    expect(&contact.name_error).to_be_visible().await.unwrap();
    expect(&contact.toast).to_be_hidden().await.unwrap();

    contact.fill_form("Test User", "test@example.com").await.unwrap();
    expect(&contact.name_input).to_have_value("Test User").await.unwrap();
    contact.submit().await.unwrap();

    expect(&contact.toast).to_contain_text("Demo only").await.unwrap();
    expect(&contact.name_input).to_have_value("").await.unwrap();
    expect(&contact.name_error).to_be_hidden().await.unwrap();
}

#[tokio::test]
async fn test_mobile_sidebar_sits_at_bottom() {
    let (page, _dir) = page(SiteOptions::default(), ViewportPreset::Mobile);
    let base = BasePage::new(page);
    base.goto().await.unwrap();

    let sidebar = base.sidebar.bounding_box().await.unwrap().unwrap();
    assert!(sidebar.y > 667.0 * 0.75);
    expect(&base.logo).to_be_hidden().await.unwrap();
}

#[tokio::test]
async fn test_skip_link_moves_to_main() {
    let (page, _dir) = page(SiteOptions::default(), ViewportPreset::Desktop);
    let base = BasePage::new(page.clone());
    base.goto().await.unwrap();

    base.skip_link.focus().await.unwrap();
    expect(&base.skip_link).to_be_in_viewport().await.unwrap();
    base.skip_link.click().await.unwrap();
    assert!(page.url().await.unwrap().ends_with("#main"));
}

#[test]
fn test_surfaces_debug_print_their_context() {
    let (page, _dir) = page(SiteOptions::default(), ViewportPreset::Desktop);
    assert!(format!("{:?}", page).contains("http://portfolio.test/"));

    let career = CareerPage::new(page.clone());
    let rendered = format!("{:?}", career);
    assert!(rendered.contains("fake-1"), "{}", rendered);
    assert!(format!("{:?}", ContactPage::new(page)).contains("ContactPage"));
}
