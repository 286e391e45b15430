// src/browser/fake.rs
//! A scripted stand-in for the site, driven through [`BrowserDriver`].
//!
//! It models just enough behavior for the login machine and the composer:
//! a compose box that clears on submit, posts that appear with status URLs,
//! and a three-field login flow.

use super::selectors::{
    AUTHENTICATED_PROBE, ATTACHMENT_PREVIEW, FILE_INPUT, LOGIN_CONFIRMATION, LOGIN_PASSWORD,
    LOGIN_USERNAME, SUBMIT_BUTTONS, TEXTAREAS,
};
use super::{BrowserDriver, KeyStroke, Locator, VisiblePost};
use crate::error::AppError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
struct State {
    username: String,
    url: String,
    present: HashSet<String>,
    input: String,
    posts: Vec<VisiblePost>,
    extra_posts: Vec<VisiblePost>,
    next_id: u64,
    clicks: Vec<String>,
    keys: Vec<KeyStroke>,
    visits: Vec<String>,
    uploads: Vec<PathBuf>,
    diagnostics: Vec<String>,
    failing_keys: HashSet<KeyStroke>,
    ignored_submissions: u32,
    submit_button_broken: bool,
    logged_in: bool,
    login_succeeds: bool,
    ask_confirmation: bool,
    last_typed: Option<String>,
    typed: Vec<(String, String)>,
    hide_author: bool,
    redirect_home_on_submit: bool,
    keep_text_after_submit: bool,
}

pub struct ScriptedDriver {
    state: Mutex<State>,
}

fn selector(locator: &Locator) -> &str {
    match locator {
        Locator::Css(s) => s,
    }
}

impl ScriptedDriver {
    pub fn new(username: &str) -> Self {
        Self {
            state: Mutex::new(State {
                username: username.to_string(),
                next_id: 1000,
                login_succeeds: true,
                ..State::default()
            }),
        }
    }

    /// A driver whose session is already signed in.
    pub fn signed_in(username: &str) -> Self {
        let driver = Self::new(username);
        driver.state.lock().unwrap().logged_in = true;
        driver
    }

    pub fn show(&self, selector: &str) {
        self.state.lock().unwrap().present.insert(selector.to_string());
    }

    pub fn fail_key(&self, key: KeyStroke) {
        self.state.lock().unwrap().failing_keys.insert(key);
    }

    /// The next `n` submissions leave the compose box untouched.
    pub fn ignore_submissions(&self, n: u32) {
        self.state.lock().unwrap().ignored_submissions = n;
    }

    pub fn break_submit_button(&self) {
        self.state.lock().unwrap().submit_button_broken = true;
    }

    pub fn reject_login(&self) {
        self.state.lock().unwrap().login_succeeds = false;
    }

    pub fn ask_confirmation(&self) {
        self.state.lock().unwrap().ask_confirmation = true;
    }

    /// Posts render without an author link.
    pub fn hide_authors(&self) {
        self.state.lock().unwrap().hide_author = true;
    }

    /// Submitting the root post sends the browser back to the home timeline
    /// and leaves the old compose text in the DOM.
    pub fn redirect_home_on_submit(&self) {
        let mut state = self.state.lock().unwrap();
        state.redirect_home_on_submit = true;
        state.keep_text_after_submit = true;
    }

    /// Posts by other accounts shown alongside ours.
    pub fn add_foreign_post(&self, author: &str, text: &str) {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let url = format!("https://x.com/{}/status/{}", author, state.next_id);
        state.extra_posts.push(VisiblePost {
            url,
            author: author.to_string(),
            text: text.to_string(),
        });
    }

    pub fn posts(&self) -> Vec<VisiblePost> {
        self.state.lock().unwrap().posts.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn keys(&self) -> Vec<KeyStroke> {
        self.state.lock().unwrap().keys.clone()
    }

    pub fn visits(&self) -> Vec<String> {
        self.state.lock().unwrap().visits.clone()
    }

    pub fn uploads(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().uploads.clone()
    }

    pub fn typed(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().typed.clone()
    }

    pub fn diagnostics(&self) -> Vec<String> {
        self.state.lock().unwrap().diagnostics.clone()
    }

    pub fn url(&self) -> String {
        self.state.lock().unwrap().url.clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.state.lock().unwrap().logged_in
    }
}

impl State {
    fn show_compose(&mut self, visible: bool) {
        for s in TEXTAREAS.iter().take(1).chain([&AUTHENTICATED_PROBE]) {
            if visible {
                self.present.insert(s.to_string());
            } else {
                self.present.remove(*s);
            }
        }
        if visible {
            self.present.insert(SUBMIT_BUTTONS[0].to_string());
            self.present.insert(FILE_INPUT.to_string());
        } else {
            self.present.remove(SUBMIT_BUTTONS[0]);
            self.present.remove(FILE_INPUT);
        }
    }

    fn textarea_present(&self, s: &str) -> bool {
        TEXTAREAS.contains(&s) && self.present.contains(s)
    }

    fn submit(&mut self) {
        if self.input.is_empty() {
            return;
        }
        if self.ignored_submissions > 0 {
            self.ignored_submissions -= 1;
            return;
        }
        self.next_id += 1;
        let author = if self.hide_author {
            String::new()
        } else {
            self.username.clone()
        };
        self.posts.push(VisiblePost {
            url: format!("https://x.com/{}/status/{}", self.username, self.next_id),
            author,
            text: std::mem::take(&mut self.input),
        });
        if self.redirect_home_on_submit && self.posts.len() == 1 {
            self.url = "https://x.com/home".to_string();
            if self.keep_text_after_submit {
                self.input = "stale".to_string();
            }
        }
        self.present.remove(ATTACHMENT_PREVIEW);
    }
}

#[async_trait::async_trait]
impl BrowserDriver for ScriptedDriver {
    async fn goto(&self, url: &str) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        state.url = url.to_string();
        state.visits.push(url.to_string());
        state.input.clear();
        if url.contains("/i/flow/login") {
            state.show_compose(false);
            state.present.insert(LOGIN_USERNAME.to_string());
        } else {
            let logged_in = state.logged_in;
            state.show_compose(logged_in);
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String, AppError> {
        Ok(self.url())
    }

    async fn wait_for(&self, locator: &Locator, _timeout: Duration) -> Result<bool, AppError> {
        Ok(self.state.lock().unwrap().present.contains(selector(locator)))
    }

    async fn click(&self, locator: &Locator) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        let s = selector(locator).to_string();
        if !state.present.contains(&s) {
            return Err(AppError::ElementNotFound(s));
        }
        state.clicks.push(s.clone());
        if SUBMIT_BUTTONS.contains(&s.as_str()) {
            if state.submit_button_broken {
                return Err(AppError::Browser("button is not clickable".into()));
            }
            state.submit();
        }
        Ok(())
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        let s = selector(locator).to_string();
        if !state.present.contains(&s) {
            return Err(AppError::ElementNotFound(s));
        }
        if state.textarea_present(&s) {
            state.input.push_str(text);
        }
        state.typed.push((s.clone(), text.to_string()));
        state.last_typed = Some(s);
        Ok(())
    }

    async fn paste_text(&self, locator: &Locator, text: &str) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        let s = selector(locator);
        if !state.textarea_present(s) {
            return Err(AppError::ElementNotFound(s.to_string()));
        }
        state.input.push_str(text);
        Ok(())
    }

    async fn press(&self, key: KeyStroke) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_keys.contains(&key) {
            return Err(AppError::Browser(format!("{:?} rejected", key)));
        }
        state.keys.push(key);
        match key {
            KeyStroke::SubmitShortcut => state.submit(),
            KeyStroke::Enter => match state.last_typed.take().as_deref() {
                Some(LOGIN_USERNAME) => {
                    state.present.remove(LOGIN_USERNAME);
                    let next = if state.ask_confirmation {
                        LOGIN_CONFIRMATION
                    } else {
                        LOGIN_PASSWORD
                    };
                    state.present.insert(next.to_string());
                }
                Some(LOGIN_CONFIRMATION) => {
                    state.present.remove(LOGIN_CONFIRMATION);
                    state.present.insert(LOGIN_PASSWORD.to_string());
                }
                Some(LOGIN_PASSWORD) => {
                    state.present.remove(LOGIN_PASSWORD);
                    if state.login_succeeds {
                        state.logged_in = true;
                    }
                }
                _ => {}
            },
            KeyStroke::Paste => {}
        }
        Ok(())
    }

    async fn text_of(&self, locator: &Locator) -> Result<Option<String>, AppError> {
        let state = self.state.lock().unwrap();
        let s = selector(locator);
        if state.textarea_present(s) {
            Ok(Some(state.input.clone()))
        } else if state.present.contains(s) {
            Ok(Some(String::new()))
        } else {
            Ok(None)
        }
    }

    async fn upload_file(&self, locator: &Locator, path: &Path) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        let s = selector(locator);
        if !state.present.contains(s) {
            return Err(AppError::ElementNotFound(s.to_string()));
        }
        state.uploads.push(path.to_path_buf());
        state.present.insert(ATTACHMENT_PREVIEW.to_string());
        Ok(())
    }

    async fn visible_posts(&self) -> Result<Vec<VisiblePost>, AppError> {
        let state = self.state.lock().unwrap();
        let profile = format!("https://x.com/{}", state.username);
        let mut posts: Vec<VisiblePost> = state
            .posts
            .iter()
            .chain(state.extra_posts.iter())
            .cloned()
            .collect();
        if state.url.eq_ignore_ascii_case(&profile) {
            // Profile timelines show the newest post first.
            posts.reverse();
        }
        Ok(posts)
    }

    async fn save_diagnostics(&self, label: &str) -> Result<Vec<PathBuf>, AppError> {
        self.state.lock().unwrap().diagnostics.push(label.to_string());
        Ok(Vec::new())
    }
}
