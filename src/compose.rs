// src/compose.rs
//! Posting a body as a thread: root post with media, then chained replies.
//!
//! Each chunk goes through the same cycle: open the compose box (the compose
//! page for the root, the parent's status page for replies), paste, submit
//! through a fallback chain, confirm the box cleared, and recover the URL of
//! the new post so the next chunk can reply to it.

use crate::browser::selectors::{
    ATTACHMENT_PREVIEW, COMPOSE_PATH, FILE_INPUT, HOME_PATH, SUBMIT_BUTTONS, TEXTAREAS,
};
use crate::browser::{
    capture_diagnostics, Action, BrowserDriver, KeyStroke, Locator, StrategyChain, Timing,
    VisiblePost,
};
use crate::config::SiteConfig;
use crate::constants::MATCH_PREFIX_CHARS;
use crate::error::AppError;
use crate::error_recovery::{retry_with_backoff, RetryPolicy};
use crate::text::{is_effectively_empty, match_prefix, normalize_for_match, split_text};
use crate::types::CharLimitRange;
use rand::Rng;
use std::path::Path;

/// Draws this run's chunk size uniformly from the configured range.
pub fn random_chunk_limit(range: CharLimitRange) -> usize {
    rand::rng().random_range(range.min()..=range.max())
}

/// What one submitted chunk produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    /// A chunk that the next one replies to.
    Posted { url: String },
    /// The last chunk; nothing replies to it, so its URL is not looked up.
    Final,
}

/// Summary of a published thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadReport {
    pub chunks: usize,
    /// URLs recovered for every chunk except the last.
    pub urls: Vec<String>,
    pub media_attached: bool,
}

impl ThreadReport {
    pub fn root_url(&self) -> Option<&str> {
        self.urls.first().map(String::as_str)
    }
}

/// Numeric id of a `/status/<id>` URL. Ids grow with posting time.
fn status_number(url: &str) -> Option<u64> {
    let (_, tail) = url.split_once("/status/")?;
    let digits: String = tail.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// The most recent of `posts`: the highest status id, or by page order when
/// no URL carries one (profile timelines list newest first, reply pages
/// oldest first).
fn newest<'a>(
    posts: impl Iterator<Item = &'a VisiblePost>,
    newest_first: bool,
) -> Option<&'a VisiblePost> {
    let posts: Vec<&VisiblePost> = posts.collect();
    if let Some(found) = posts
        .iter()
        .filter_map(|p| status_number(&p.url).map(|id| (id, *p)))
        .max_by_key(|(id, _)| *id)
    {
        return Some(found.1);
    }
    if newest_first {
        posts.first().copied()
    } else {
        posts.last().copied()
    }
}

/// Picks our post out of the rendered posts.
///
/// The first post by `username` whose normalized text contains `prefix` wins.
/// Without one, the most recent post by `username` is assumed to be ours,
/// then the most recent post on the page. `exclude` (the parent) is never
/// returned; without a parent the page is the profile timeline.
pub fn match_posted_unit<'a>(
    posts: &'a [VisiblePost],
    prefix: &str,
    username: &str,
    exclude: Option<&str>,
) -> Option<&'a VisiblePost> {
    let candidates = || posts.iter().filter(move |p| Some(p.url.as_str()) != exclude);
    let ours = |p: &&VisiblePost| p.author.eq_ignore_ascii_case(username);
    let newest_first = exclude.is_none();

    if !prefix.is_empty() {
        if let Some(found) = candidates()
            .filter(ours)
            .find(|p| normalize_for_match(&p.text).contains(prefix))
        {
            return Some(found);
        }
    }

    if let Some(latest) = newest(candidates().filter(ours), newest_first) {
        log::warn!("No post matched the chunk text; assuming latest by @{}", username);
        return Some(latest);
    }

    let latest = newest(candidates(), newest_first);
    if latest.is_some() {
        log::warn!("No post by @{} visible; assuming the latest post on the page", username);
    }
    latest
}

/// Opens the page where the chunk should have appeared and finds its URL.
///
/// The root is looked up on the account's profile, a reply on its parent's
/// status page.
pub async fn locate_posted_unit<D: BrowserDriver + ?Sized>(
    driver: &D,
    site: &SiteConfig,
    timing: &Timing,
    chunk: &str,
    parent: Option<&str>,
) -> Result<Option<String>, AppError> {
    let page = parent
        .map(str::to_string)
        .unwrap_or_else(|| site.profile_url());
    driver.goto(&page).await?;
    tokio::time::sleep(timing.settle).await;

    let posts = driver.visible_posts().await?;
    log::debug!("{} posts visible on {}", posts.len(), page);
    let prefix = match_prefix(chunk, MATCH_PREFIX_CHARS);
    Ok(match_posted_unit(&posts, &prefix, &site.username, parent).map(|p| p.url.clone()))
}

/// Publishes one body as a thread through a signed-in browser.
pub struct ThreadComposer<'a, D: BrowserDriver + ?Sized> {
    driver: &'a D,
    site: &'a SiteConfig,
    timing: Timing,
    policy: RetryPolicy,
}

impl<'a, D: BrowserDriver + ?Sized> ThreadComposer<'a, D> {
    pub fn new(driver: &'a D, site: &'a SiteConfig, submit_attempts: u32) -> Self {
        Self {
            driver,
            site,
            timing: Timing::default(),
            policy: RetryPolicy::ui_submit(submit_attempts),
        }
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Splits `text` at `limit` characters and posts the chunks as a thread.
    ///
    /// Media, when given, goes on the root post. A chunk that cannot be
    /// submitted or located stops the thread; earlier chunks stay posted.
    pub async fn publish(
        &self,
        text: &str,
        limit: usize,
        media: Option<&Path>,
    ) -> Result<ThreadReport, AppError> {
        let chunks = split_text(text, limit);
        if chunks.is_empty() {
            return Err(AppError::Validation("post body is empty".to_string()));
        }
        let total = chunks.len();
        log::info!("Publishing {} chunk(s) of up to {} characters", total, limit);

        let mut report = ThreadReport {
            chunks: total,
            urls: Vec::with_capacity(total.saturating_sub(1)),
            media_attached: false,
        };
        let mut parent: Option<String> = None;

        for (index, chunk) in chunks.iter().enumerate() {
            let attach = if index == 0 { media } else { None };
            let outcome = self
                .post_unit(index, total, chunk, parent.as_deref(), attach, &mut report)
                .await?;
            if let UnitOutcome::Posted { url } = outcome {
                log::info!("Chunk {}/{} posted at {}", index + 1, total, url);
                report.urls.push(url.clone());
                parent = Some(url);
            } else {
                log::info!("Chunk {}/{} posted", index + 1, total);
            }
        }
        Ok(report)
    }

    async fn post_unit(
        &self,
        index: usize,
        total: usize,
        chunk: &str,
        parent: Option<&str>,
        media: Option<&Path>,
        report: &mut ThreadReport,
    ) -> Result<UnitOutcome, AppError> {
        let is_root = parent.is_none();
        let page = match parent {
            Some(url) => url.to_string(),
            None => self.site.url(COMPOSE_PATH),
        };
        self.driver.goto(&page).await?;
        tokio::time::sleep(self.timing.settle).await;

        let textarea = match self.find_textarea().await? {
            Some(locator) => locator,
            None => {
                capture_diagnostics(self.driver, &format!("textarea_missing_{}", index + 1)).await;
                return Err(AppError::ElementNotFound(format!(
                    "compose box for chunk {} of {}",
                    index + 1,
                    total
                )));
            }
        };

        if let Some(path) = media {
            report.media_attached = self.attach_media(path).await;
        }

        self.driver.paste_text(&textarea, chunk).await?;
        tokio::time::sleep(self.timing.settle).await;

        if !self.submit(&textarea, is_root).await? {
            capture_diagnostics(self.driver, &format!("submit_failed_{}", index + 1)).await;
            return Err(AppError::ChunkNotSubmitted {
                index: index + 1,
                total,
                attempts: self.policy.max_attempts,
            });
        }

        if index + 1 == total {
            return Ok(UnitOutcome::Final);
        }

        match locate_posted_unit(self.driver, self.site, &self.timing, chunk, parent).await? {
            Some(url) => Ok(UnitOutcome::Posted { url }),
            None => {
                capture_diagnostics(self.driver, &format!("url_missing_{}", index + 1)).await;
                Err(AppError::ThreadBroken { index: index + 1 })
            }
        }
    }

    async fn find_textarea(&self) -> Result<Option<Locator>, AppError> {
        for (i, selector) in TEXTAREAS.iter().enumerate() {
            let locator = Locator::css(*selector);
            let wait = if i == 0 {
                self.timing.element
            } else {
                std::time::Duration::ZERO
            };
            if self.driver.wait_for(&locator, wait).await? {
                log::debug!("Compose box found via {}", locator);
                return Ok(Some(locator));
            }
        }
        Ok(None)
    }

    /// Uploads the media and waits for its preview. Failures are logged and
    /// the chunk is posted without media.
    async fn attach_media(&self, path: &Path) -> bool {
        let input = Locator::css(FILE_INPUT);
        if let Err(e) = self.driver.upload_file(&input, path).await {
            log::warn!("Media upload failed, posting without media: {}", e);
            return false;
        }
        match self
            .driver
            .wait_for(&Locator::css(ATTACHMENT_PREVIEW), self.timing.media)
            .await
        {
            Ok(true) => {
                log::info!("Media attached: {}", path.display());
                true
            }
            Ok(false) => {
                log::warn!("Attachment preview never appeared; continuing");
                false
            }
            Err(e) => {
                log::warn!("Could not confirm the attachment: {}", e);
                false
            }
        }
    }

    /// Odd attempts try the button first, even attempts the shortcut first.
    fn submit_chain(&self, attempt: u32) -> StrategyChain {
        let shortcut = Action::Press(KeyStroke::SubmitShortcut);
        if attempt % 2 == 1 {
            StrategyChain::clicking_any(self.timing.element, SUBMIT_BUTTONS)
                .then("submit shortcut", shortcut)
        } else {
            SUBMIT_BUTTONS.iter().fold(
                StrategyChain::new(self.timing.element).then("submit shortcut", shortcut),
                |chain, selector| chain.then(*selector, Action::Click(Locator::css(*selector))),
            )
        }
    }

    async fn submit(&self, textarea: &Locator, is_root: bool) -> Result<bool, AppError> {
        let result = retry_with_backoff(
            self.policy,
            "Submit",
            |e| matches!(e, AppError::SubmitUnconfirmed),
            |attempt| async move {
                let outcome = self.submit_chain(attempt).run(self.driver).await;
                log::debug!("Submit attempt {}: {:?}", attempt, outcome);
                tokio::time::sleep(self.timing.settle).await;
                if self.confirmed(textarea, is_root).await? {
                    Ok(())
                } else {
                    Err(AppError::SubmitUnconfirmed)
                }
            },
        )
        .await;
        match result {
            Ok(()) => Ok(true),
            Err(AppError::SubmitUnconfirmed) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// The compose box is empty or gone, or the root post sent us home.
    async fn confirmed(&self, textarea: &Locator, is_root: bool) -> Result<bool, AppError> {
        match self.driver.text_of(textarea).await? {
            None => return Ok(true),
            Some(text) if is_effectively_empty(&text) => return Ok(true),
            Some(_) => {}
        }
        if is_root {
            let current = self.driver.current_url().await?;
            let on_home = url::Url::parse(&current)
                .map(|u| u.path().trim_end_matches('/') == HOME_PATH)
                .unwrap_or(false);
            if on_home {
                log::info!("Redirected to the home timeline; treating the root post as sent");
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::ScriptedDriver;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use std::time::Duration;

    fn site() -> SiteConfig {
        SiteConfig {
            username: "jobs_bot".to_string(),
            password: "hunter2".to_string(),
            email: None,
            base_url: None,
        }
    }

    fn quick(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts: attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    fn composer<'a>(driver: &'a ScriptedDriver, site: &'a SiteConfig) -> ThreadComposer<'a, ScriptedDriver> {
        ThreadComposer::new(driver, site, 3)
            .with_timing(Timing::immediate())
            .with_policy(quick(3))
    }

    fn alphabet_text(len: usize) -> String {
        (0..len).map(|i| (b'a' + (i % 26) as u8) as char).collect()
    }

    fn post(url: &str, author: &str, text: &str) -> VisiblePost {
        VisiblePost {
            url: url.to_string(),
            author: author.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn chunk_limit_stays_in_range() {
        let range = CharLimitRange::new(135, 150).unwrap();
        for _ in 0..200 {
            let limit = random_chunk_limit(range);
            assert!((135..=150).contains(&limit));
        }
        assert_eq!(random_chunk_limit(CharLimitRange::new(140, 140).unwrap()), 140);
    }

    #[test]
    fn match_prefers_prefix_by_account() {
        let posts = vec![
            post("https://x.com/other/status/1", "other", "Hiring now: Rust engineers"),
            post("https://x.com/jobs_bot/status/2", "jobs_bot", "Something older"),
            post("https://x.com/jobs_bot/status/3", "jobs_bot", "Hiring now:  Rust engineers 🚀"),
        ];
        let found = match_posted_unit(&posts, "Hiring now: Rust", "jobs_bot", None).unwrap();
        assert_eq!(found.url, "https://x.com/jobs_bot/status/3");
    }

    #[test]
    fn match_falls_back_to_last_by_account_then_last_overall() {
        let posts = vec![
            post("https://x.com/jobs_bot/status/1", "jobs_bot", "first"),
            post("https://x.com/jobs_bot/status/2", "jobs_bot", "second"),
            post("https://x.com/other/status/3", "other", "third"),
        ];
        let found = match_posted_unit(&posts, "no such text", "JOBS_BOT", None).unwrap();
        assert_eq!(found.url, "https://x.com/jobs_bot/status/2");

        let anonymous = vec![post("https://x.com/a/status/7", "", "x"), post("https://x.com/b/status/8", "", "y")];
        let found = match_posted_unit(&anonymous, "zzz", "jobs_bot", None).unwrap();
        assert_eq!(found.url, "https://x.com/b/status/8");
        assert!(match_posted_unit(&[], "zzz", "jobs_bot", None).is_none());
    }

    #[test]
    fn unmatched_prefix_on_profile_picks_the_newest_post() {
        // Profile order: newest first. The leading link renders shortened.
        let posts = vec![
            post("https://x.com/jobs_bot/status/900", "jobs_bot", "example.com/jobs… Hiring now"),
            post("https://x.com/jobs_bot/status/100", "jobs_bot", "An older announcement"),
        ];
        let prefix = match_prefix("https://example.com/jobs Hiring now", 20);
        let found = match_posted_unit(&posts, &prefix, "jobs_bot", None).unwrap();
        assert_eq!(found.url, "https://x.com/jobs_bot/status/900");
    }

    #[test]
    fn without_status_ids_page_order_decides() {
        let posts = vec![
            post("https://x.com/jobs_bot/a", "jobs_bot", "newer"),
            post("https://x.com/jobs_bot/b", "jobs_bot", "older"),
        ];
        let on_profile = match_posted_unit(&posts, "zzz", "jobs_bot", None).unwrap();
        assert_eq!(on_profile.url, "https://x.com/jobs_bot/a");
        let on_reply_page =
            match_posted_unit(&posts, "zzz", "jobs_bot", Some("https://x.com/jobs_bot/status/1")).unwrap();
        assert_eq!(on_reply_page.url, "https://x.com/jobs_bot/b");
        assert_eq!(status_number("https://x.com/u/status/42?s=20"), Some(42));
        assert_eq!(status_number("https://x.com/u"), None);
    }

    #[test]
    fn match_never_returns_the_parent() {
        let posts = vec![post("https://x.com/jobs_bot/status/1", "jobs_bot", "same text")];
        assert!(match_posted_unit(&posts, "same text", "jobs_bot", Some("https://x.com/jobs_bot/status/1")).is_none());
    }

    #[tokio::test]
    async fn long_body_becomes_a_chained_thread() {
        let driver = ScriptedDriver::signed_in("jobs_bot");
        let site = site();
        let text = alphabet_text(320);

        let report = composer(&driver, &site).publish(&text, 140, None).await.unwrap();

        let posts = driver.posts();
        let lengths: Vec<usize> = posts.iter().map(|p| p.text.chars().count()).collect();
        assert_eq!(lengths, vec![140, 140, 40]);
        assert_eq!(posts.iter().map(|p| p.text.as_str()).collect::<String>(), text);
        assert_eq!(report.chunks, 3);
        assert_eq!(report.urls, vec![posts[0].url.clone(), posts[1].url.clone()]);
        assert_eq!(report.root_url(), Some(posts[0].url.as_str()));

        // Replies are composed on the parent's page.
        let visits = driver.visits();
        assert_eq!(visits[0], "https://x.com/compose/post");
        assert!(visits.contains(&posts[0].url));
        assert!(visits.contains(&posts[1].url));
    }

    #[tokio::test]
    async fn ignored_submission_is_retried_with_the_shortcut() {
        let driver = ScriptedDriver::signed_in("jobs_bot");
        driver.ignore_submissions(1);
        let site = site();

        composer(&driver, &site).publish("short post", 140, None).await.unwrap();

        assert_eq!(driver.posts().len(), 1);
        assert_eq!(driver.clicks(), vec![SUBMIT_BUTTONS[0].to_string()]);
        assert_eq!(driver.keys(), vec![KeyStroke::SubmitShortcut]);
    }

    #[tokio::test]
    async fn posts_without_author_links_still_chain() {
        let driver = ScriptedDriver::signed_in("jobs_bot");
        driver.hide_authors();
        let site = site();

        let report = composer(&driver, &site)
            .publish(&alphabet_text(200), 140, None)
            .await
            .unwrap();

        let posts = driver.posts();
        assert_eq!(posts.len(), 2);
        assert_eq!(report.urls, vec![posts[0].url.clone()]);
    }

    #[tokio::test]
    async fn broken_button_falls_back_to_shortcut() {
        let driver = ScriptedDriver::signed_in("jobs_bot");
        driver.break_submit_button();
        let site = site();

        composer(&driver, &site).publish("short post", 140, None).await.unwrap();
        assert_eq!(driver.posts().len(), 1);
        assert_eq!(driver.keys(), vec![KeyStroke::SubmitShortcut]);
    }

    #[tokio::test]
    async fn chunk_fails_after_all_attempts() {
        let driver = ScriptedDriver::signed_in("jobs_bot");
        driver.ignore_submissions(u32::MAX);
        let site = site();

        let err = composer(&driver, &site)
            .publish(&alphabet_text(200), 140, None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::ChunkNotSubmitted {
                index: 1,
                total: 2,
                attempts: 3
            }
        ));
        assert!(driver.posts().is_empty());
        assert_eq!(driver.diagnostics(), vec!["submit_failed_1".to_string()]);
    }

    #[tokio::test]
    async fn foreign_posts_are_not_replied_to() {
        let driver = ScriptedDriver::signed_in("jobs_bot");
        let text = alphabet_text(200);
        driver.add_foreign_post("copycat", &text[..140]);
        let site = site();

        let report = composer(&driver, &site).publish(&text, 140, None).await.unwrap();

        let ours = &driver.posts()[0];
        assert_eq!(report.urls, vec![ours.url.clone()]);
        assert!(!driver.visits().iter().any(|v| v.contains("copycat")));
    }

    #[tokio::test]
    async fn home_redirect_confirms_the_root_post() {
        let driver = ScriptedDriver::signed_in("jobs_bot");
        driver.redirect_home_on_submit();
        let site = site();

        let report = composer(&driver, &site)
            .publish(&alphabet_text(150), 140, None)
            .await
            .unwrap();

        assert_eq!(driver.posts().len(), 2);
        assert_eq!(report.urls, vec![driver.posts()[0].url.clone()]);
    }

    #[tokio::test]
    async fn media_goes_on_the_root_only() {
        let driver = ScriptedDriver::signed_in("jobs_bot");
        let site = site();
        let media = PathBuf::from("/tmp/work/temp_media.png");

        let report = composer(&driver, &site)
            .publish(&alphabet_text(150), 140, Some(&media))
            .await
            .unwrap();

        assert!(report.media_attached);
        assert_eq!(driver.uploads(), vec![media]);
    }

    #[tokio::test]
    async fn empty_body_is_rejected() {
        let driver = ScriptedDriver::signed_in("jobs_bot");
        let site = site();
        let err = composer(&driver, &site).publish("", 140, None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(driver.visits().is_empty());
    }
}
