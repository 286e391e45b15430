// src/browser/selectors.rs
//! Page structure of the site, in priority order.
//!
//! These lists are the part of the system most likely to break when the site
//! changes its markup. Earlier entries are tried first.

/// Compose input areas. The Japanese label covers localized UIs.
pub const TEXTAREAS: &[&str] = &[
    r#"div[data-testid="tweetTextarea_0"]"#,
    r#"div[data-testid="tweetTextarea_1"]"#,
    r#"div[role="textbox"]"#,
    r#"div[aria-label="Post text"]"#,
    r#"div[aria-label="ポスト本文"]"#,
];

/// Only rendered for a signed-in session.
pub const AUTHENTICATED_PROBE: &str = r#"[data-testid="tweetTextarea_0"]"#;

/// Primary submit controls (inline and modal composer).
pub const SUBMIT_BUTTONS: &[&str] = &[
    r#"[data-testid="tweetButton"]"#,
    r#"[data-testid="tweetButtonInline"]"#,
];

/// Hidden media input of the composer.
pub const FILE_INPUT: &str = r#"input[data-testid="fileInput"]"#;

/// Rendered once an upload has been accepted.
pub const ATTACHMENT_PREVIEW: &str =
    r#"div[data-testid="attachments"] img, div[data-testid="attachments"] video"#;

// Login flow
pub const LOGIN_USERNAME: &str = r#"input[autocomplete="username"]"#;
pub const LOGIN_CONFIRMATION: &str = r#"input[data-testid="ocfEnterTextTextInput"]"#;
pub const LOGIN_PASSWORD: &str = r#"input[name="password"]"#;

// Paths relative to the site base URL
pub const HOME_PATH: &str = "/home";
pub const COMPOSE_PATH: &str = "/compose/post";
pub const LOGIN_PATH: &str = "/i/flow/login";

/// Collects `{url, author, text}` for every rendered post, in document order.
pub const VISIBLE_POSTS_JS: &str = r#"
(() => {
  const posts = [];
  for (const article of document.querySelectorAll('article[data-testid="tweet"]')) {
    const textNode = article.querySelector('[data-testid="tweetText"]');
    const link = Array.from(article.querySelectorAll('a[href*="/status/"]'))
      .find(a => a.querySelector('time'));
    const authorLink = article.querySelector('[data-testid="User-Name"] a[href^="/"]');
    if (!link) continue;
    posts.push({
      url: new URL(link.getAttribute('href'), location.origin).href,
      author: authorLink ? authorLink.getAttribute('href').replace(/^\//, '') : '',
      text: textNode ? textNode.innerText : ''
    });
  }
  return posts;
})()
"#;
