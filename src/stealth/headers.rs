const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "en-GB,en;q=0.9",
    "en-US,en;q=0.9,es;q=0.8",
    "en-US,en;q=0.9,fr;q=0.8",
    "en-US,en;q=0.9,de;q=0.8",
];

const ACCEPT_ENCODINGS: &[&str] = &["gzip, deflate, br", "gzip, deflate"];

const CHROME_PLATFORMS: &[&str] = &["\"Windows\"", "\"macOS\"", "\"Linux\""];

const CHROME_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8";
const FIREFOX_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const SAFARI_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Browser family inferred from a user agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserKind {
    Chrome,
    Firefox,
    Safari,
    Edge,
}

impl BrowserKind {
    pub fn detect(user_agent: &str) -> Self {
        let ua = user_agent.to_lowercase();
        if ua.contains("edg/") {
            BrowserKind::Edge
        } else if ua.contains("firefox") {
            BrowserKind::Firefox
        } else if ua.contains("safari") && !ua.contains("chrome") {
            BrowserKind::Safari
        } else {
            BrowserKind::Chrome
        }
    }
}

fn pick<'a>(choices: &[&'a str]) -> &'a str {
    choices[rand::random_range(0..choices.len())]
}

/// Builds request headers consistent with the chosen user agent
pub fn browser_headers(user_agent: &str, referer: Option<&str>) -> Vec<(String, String)> {
    let mut headers: Vec<(&str, String)> = vec![
        ("User-Agent", user_agent.to_string()),
        ("Accept-Language", pick(ACCEPT_LANGUAGES).to_string()),
        ("Accept-Encoding", pick(ACCEPT_ENCODINGS).to_string()),
    ];

    let kind = BrowserKind::detect(user_agent);
    match kind {
        BrowserKind::Chrome | BrowserKind::Edge => {
            let brand = if kind == BrowserKind::Edge {
                "\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"120\", \"Microsoft Edge\";v=\"120\""
            } else {
                "\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"120\", \"Google Chrome\";v=\"120\""
            };
            headers.push(("Accept", CHROME_ACCEPT.to_string()));
            headers.push(("Sec-Ch-Ua", brand.to_string()));
            headers.push(("Sec-Ch-Ua-Mobile", "?0".to_string()));
            headers.push(("Sec-Ch-Ua-Platform", pick(CHROME_PLATFORMS).to_string()));
            push_fetch_metadata(&mut headers, referer.is_some());
        }
        BrowserKind::Firefox => {
            headers.push(("Accept", FIREFOX_ACCEPT.to_string()));
            push_fetch_metadata(&mut headers, referer.is_some());
        }
        BrowserKind::Safari => headers.push(("Accept", SAFARI_ACCEPT.to_string())),
    }

    if let Some(referer) = referer {
        headers.push(("Referer", referer.to_string()));
    }

    if rand::random_bool(0.5) {
        headers.push(("DNT", "1".to_string()));
    }
    if rand::random_bool(0.3) {
        headers.push(("Upgrade-Insecure-Requests", "1".to_string()));
    }

    headers
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

fn push_fetch_metadata(headers: &mut Vec<(&str, String)>, same_origin: bool) {
    let site = if same_origin { "same-origin" } else { "none" };
    headers.push(("Sec-Fetch-Dest", "document".to_string()));
    headers.push(("Sec-Fetch-Mode", "navigate".to_string()));
    headers.push(("Sec-Fetch-Site", site.to_string()));
    headers.push(("Sec-Fetch-User", "?1".to_string()));
}
