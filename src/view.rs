use crate::config::{Config, CATEGORIES};
use crate::flow::{FlowButton, Prompt};
use crate::storage::Movie;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use std::collections::BTreeSet;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use unicode_segmentation::UnicodeSegmentation;

/// Лимит подписи к фото в Telegram.
pub const CAPTION_LIMIT: usize = 1024;
/// Фильмов на одной странице списка. Telegram не примет клавиатуру
/// больше чем на 100 кнопок, а в списке владельца их по две в строке.
pub const PAGE_SIZE: usize = 20;

pub const WELCOME_TEXT: &str = "🎬 <b>Welcome to Movie Database Bot!</b> 🎥\n\
Your personal movie companion 🌟\n\n\
✨ <b>What can I do?</b>\n\
• 🎯 Browse movies by category\n\
• 🔍 Search for specific titles\n\
• 🎲 Get recommendations\n\
• 📥 Access direct download links\n\n\
🚀 Use the buttons below to explore!";

pub const HELP_TEXT: &str = "<b>How to use this bot</b>\n\n\
/start - main menu\n\
/search &lt;title&gt; - find a movie by name\n\
/cancel - stop the current dialog\n\n\
Owner only:\n\
/addmovie - add a movie step by step\n\
/delmovie - delete a movie\n\
/listmovies - all movies with visibility switches\n\
/hide &lt;id&gt;, /show &lt;id&gt; - hide or show a movie";

/* ====== callback_data ======
   flow:   cancel | skip | addcat:<name> | addcat_done | delpick:<id> | delpage:<n> | delyes:<id> | delno | search
   browse: menu:<item> | browse:<category> | movie:<id> | vis:<id>
   pages:  page_rec:<n> | page_own:<n> | page_cat:<n>:<category>
*/
static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([a-z_]+)(?::(.+))?$").expect("valid token regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    Owner,
    Recommend,
    Categories,
    Help,
}

/// Списки, которые листаются кнопками Prev/Next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListKind {
    Recommend,
    Owner,
    Category(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    Cancel,
    Search,
    Flow(FlowButton),
    Menu(MenuItem),
    Browse(String),
    Movie(u64),
    Visibility(u64),
    Page(ListKind, usize),
}

impl Callback {
    pub fn parse(data: &str) -> Option<Self> {
        let caps = TOKEN.captures(data)?;
        let kind = caps.get(1)?.as_str();
        let arg = caps.get(2).map(|m| m.as_str());
        let id = || arg.and_then(|a| a.parse::<u64>().ok());
        let cb = match (kind, arg) {
            ("cancel", None) => Callback::Cancel,
            ("search", None) => Callback::Search,
            ("skip", None) => Callback::Flow(FlowButton::Skip),
            ("addcat_done", None) => Callback::Flow(FlowButton::CategoriesDone),
            ("addcat", Some(name)) => Callback::Flow(FlowButton::Category(name.to_string())),
            ("delpick", Some(_)) => Callback::Flow(FlowButton::Pick(id()?)),
            ("delpage", Some(n)) => Callback::Flow(FlowButton::Page(n.parse().ok()?)),
            ("delyes", Some(_)) => Callback::Flow(FlowButton::Confirm(id()?)),
            ("delno", None) => Callback::Flow(FlowButton::Decline),
            ("menu", Some("owner")) => Callback::Menu(MenuItem::Owner),
            ("menu", Some("recommend")) => Callback::Menu(MenuItem::Recommend),
            ("menu", Some("categories")) => Callback::Menu(MenuItem::Categories),
            ("menu", Some("help")) => Callback::Menu(MenuItem::Help),
            ("browse", Some(category)) => Callback::Browse(category.to_string()),
            ("movie", Some(_)) => Callback::Movie(id()?),
            ("vis", Some(_)) => Callback::Visibility(id()?),
            ("page_rec", Some(n)) => Callback::Page(ListKind::Recommend, n.parse().ok()?),
            ("page_own", Some(n)) => Callback::Page(ListKind::Owner, n.parse().ok()?),
            ("page_cat", Some(rest)) => {
                let (n, category) = rest.split_once(':')?;
                Callback::Page(ListKind::Category(category.to_string()), n.parse().ok()?)
            }
            _ => return None,
        };
        Some(cb)
    }

    pub fn token(&self) -> String {
        match self {
            Callback::Cancel => "cancel".into(),
            Callback::Search => "search".into(),
            Callback::Flow(FlowButton::Skip) => "skip".into(),
            Callback::Flow(FlowButton::CategoriesDone) => "addcat_done".into(),
            Callback::Flow(FlowButton::Category(name)) => format!("addcat:{name}"),
            Callback::Flow(FlowButton::Pick(id)) => format!("delpick:{id}"),
            Callback::Flow(FlowButton::Page(page)) => format!("delpage:{page}"),
            Callback::Flow(FlowButton::Confirm(id)) => format!("delyes:{id}"),
            Callback::Flow(FlowButton::Decline) => "delno".into(),
            Callback::Menu(item) => {
                let item = match item {
                    MenuItem::Owner => "owner",
                    MenuItem::Recommend => "recommend",
                    MenuItem::Categories => "categories",
                    MenuItem::Help => "help",
                };
                format!("menu:{item}")
            }
            Callback::Browse(category) => format!("browse:{category}"),
            Callback::Movie(id) => format!("movie:{id}"),
            Callback::Visibility(id) => format!("vis:{id}"),
            Callback::Page(ListKind::Recommend, page) => format!("page_rec:{page}"),
            Callback::Page(ListKind::Owner, page) => format!("page_own:{page}"),
            Callback::Page(ListKind::Category(category), page) => format!("page_cat:{page}:{category}"),
        }
    }
}

fn button(text: impl Into<String>, cb: Callback) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, cb.token())
}

fn cancel_row() -> Vec<InlineKeyboardButton> {
    vec![button("❌ Cancel", Callback::Cancel)]
}

fn skip_cancel_row() -> Vec<InlineKeyboardButton> {
    vec![button("⏭ Skip", Callback::Flow(FlowButton::Skip)), button("❌ Cancel", Callback::Cancel)]
}

/// Текст и клавиатура для ответа машины состояний.
pub fn prompt(p: &Prompt) -> (String, Option<InlineKeyboardMarkup>) {
    let with = |rows: Vec<Vec<InlineKeyboardButton>>| Some(InlineKeyboardMarkup::new(rows));
    match p {
        Prompt::AskName => ("🎬 Please enter the movie name:".into(), with(vec![cancel_row()])),
        Prompt::AskDescription => ("📝 Please enter the movie description:".into(), with(vec![skip_cancel_row()])),
        Prompt::AskPoster => ("🖼 Please enter the movie poster URL:".into(), with(vec![skip_cancel_row()])),
        Prompt::CheckingPoster => ("⏳ Checking the poster…".into(), None),
        Prompt::InvalidPoster => (
            "⚠️ That link does not point to an image I can open. Please send another poster URL:".into(),
            with(vec![skip_cancel_row()]),
        ),
        Prompt::AskDownloadLink => ("📥 Please enter the download link:".into(), with(vec![skip_cancel_row()])),
        Prompt::AskChannelLink => ("📢 Please enter the Telegram channel link:".into(), with(vec![skip_cancel_row()])),
        Prompt::AskCategories { selected } => (
            categories_prompt_text(selected),
            Some(category_picker(selected)),
        ),
        Prompt::MissingName => ("⚠️ The movie has no name. Start again with /addmovie.".into(), None),
        Prompt::AskQuery => ("🔍 Please enter the movie name you want to search:".into(), with(vec![cancel_row()])),
        Prompt::OwnerOnly => ("⛔ This command is only for the bot owner!".into(), None),
        Prompt::Cancelled => ("❌ Cancelled.".into(), None),
        Prompt::NothingToCancel => ("Nothing to cancel.".into(), None),
        Prompt::DeleteDeclined => ("👍 Deletion cancelled, nothing was removed.".into(), None),
        Prompt::Expired => ("⌛ This menu has expired. Use /start to begin again.".into(), None),
        Prompt::IdleHint => ("Use /start for the menu or /search to find a movie.".into(), None),
    }
}

fn categories_prompt_text(selected: &BTreeSet<String>) -> String {
    if selected.is_empty() {
        "🎭 Select movie categories, then press Done:".into()
    } else {
        let names: Vec<&str> = selected.iter().map(String::as_str).collect();
        format!("🎭 Selected: {}\nAdd more or press Done:", html_escape(&names.join(", ")))
    }
}

fn category_picker(selected: &BTreeSet<String>) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = CATEGORIES
        .chunks(2)
        .map(|pair| {
            pair.iter()
                .map(|(emoji, name)| {
                    let mark = if selected.contains(*name) { "✅" } else { *emoji };
                    button(
                        format!("{mark} {name}"),
                        Callback::Flow(FlowButton::Category(name.to_string())),
                    )
                })
                .collect()
        })
        .collect();
    rows.push(vec![
        button("✔️ Done", Callback::Flow(FlowButton::CategoriesDone)),
        button("❌ Cancel", Callback::Cancel),
    ]);
    InlineKeyboardMarkup::new(rows)
}

/* ====== Меню ====== */

pub fn main_menu(config: &Config) -> InlineKeyboardMarkup {
    let mut first = vec![button("👤 Owner Info", Callback::Menu(MenuItem::Owner))];
    if let Some(url) = &config.support_url {
        first.push(InlineKeyboardButton::url("💬 Support", url.clone()));
    }
    InlineKeyboardMarkup::new(vec![
        first,
        vec![
            button("🎲 Recommend", Callback::Menu(MenuItem::Recommend)),
            button("🔍 Search", Callback::Search),
        ],
        vec![
            button("📚 Categories", Callback::Menu(MenuItem::Categories)),
            button("❓ Help", Callback::Menu(MenuItem::Help)),
        ],
    ])
}

pub fn categories_menu() -> InlineKeyboardMarkup {
    let rows = CATEGORIES
        .chunks(2)
        .map(|pair| {
            pair.iter()
                .map(|(emoji, name)| button(format!("{emoji} {name}"), Callback::Browse(name.to_string())))
                .collect()
        })
        .collect::<Vec<Vec<_>>>();
    InlineKeyboardMarkup::new(rows)
}

/* ====== Списки по страницам ====== */

struct Page<'a> {
    movies: &'a [Movie],
    number: usize,
    has_next: bool,
}

/// Номер страницы за пределами списка прижимается к последней.
fn paginate(movies: &[Movie], page: usize) -> Page<'_> {
    let last = movies.len().saturating_sub(1) / PAGE_SIZE;
    let number = page.min(last);
    let start = number * PAGE_SIZE;
    let end = (start + PAGE_SIZE).min(movies.len());
    Page { movies: &movies[start..end], number, has_next: end < movies.len() }
}

fn nav_row(page: &Page<'_>, to: impl Fn(usize) -> Callback) -> Option<Vec<InlineKeyboardButton>> {
    let mut row = Vec::new();
    if page.number > 0 {
        row.push(button("◀️ Prev", to(page.number - 1)));
    }
    if page.has_next {
        row.push(button("Next ▶️", to(page.number + 1)));
    }
    (!row.is_empty()).then_some(row)
}

/// Страница, на которой стоит фильм с этим id.
pub fn page_of(movies: &[Movie], id: u64) -> usize {
    movies.iter().position(|m| m.id == id).unwrap_or(0) / PAGE_SIZE
}

/// По одному фильму в строке, эмодзи по первой категории. Без `list`
/// показывается только первая страница.
pub fn movie_list(movies: &[Movie], page: usize, list: Option<ListKind>) -> InlineKeyboardMarkup {
    let page = paginate(movies, page);
    let mut rows = page
        .movies
        .iter()
        .map(|m| vec![button(format!("{} {}", movie_emoji(m), m.name), Callback::Movie(m.id))])
        .collect::<Vec<_>>();
    if let Some(list) = list {
        rows.extend(nav_row(&page, |n| Callback::Page(list.clone(), n)));
    }
    InlineKeyboardMarkup::new(rows)
}

pub fn delete_picker(movies: &[Movie], page: usize) -> InlineKeyboardMarkup {
    let page = paginate(movies, page);
    let mut rows = page
        .movies
        .iter()
        .map(|m| {
            vec![button(
                format!("🗑 #{} {}", m.id, m.name),
                Callback::Flow(FlowButton::Pick(m.id)),
            )]
        })
        .collect::<Vec<_>>();
    rows.extend(nav_row(&page, |n| Callback::Flow(FlowButton::Page(n))));
    rows.push(cancel_row());
    InlineKeyboardMarkup::new(rows)
}

pub fn delete_confirmation(id: u64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        button("✅ Yes, delete", Callback::Flow(FlowButton::Confirm(id))),
        button("↩️ No", Callback::Flow(FlowButton::Decline)),
    ]])
}

/// Список для владельца: фильм + переключатель видимости.
pub fn owner_list(movies: &[Movie], page: usize) -> InlineKeyboardMarkup {
    let page = paginate(movies, page);
    let mut rows = page
        .movies
        .iter()
        .map(|m| {
            let (icon, action) = if m.visible { ("👁", "Hide") } else { ("🙈", "Show") };
            vec![
                button(format!("{icon} #{} {}", m.id, m.name), Callback::Movie(m.id)),
                button(action, Callback::Visibility(m.id)),
            ]
        })
        .collect::<Vec<_>>();
    rows.extend(nav_row(&page, |n| Callback::Page(ListKind::Owner, n)));
    InlineKeyboardMarkup::new(rows)
}

/// Кнопки карточки фильма. Ссылки, которые Telegram не примет, пропускаем.
pub fn movie_buttons(m: &Movie) -> InlineKeyboardMarkup {
    let mut row = Vec::new();
    if let Some(url) = m.download_link.as_deref().and_then(web_url) {
        row.push(InlineKeyboardButton::url("⬇️ Download", url));
    }
    if let Some(url) = m.telegram_link.as_deref().and_then(web_url) {
        row.push(InlineKeyboardButton::url("📢 Channel", url));
    }
    let mut rows = Vec::new();
    if !row.is_empty() {
        rows.push(row);
    }
    if let Some(url) = share_url(m) {
        rows.push(vec![InlineKeyboardButton::url("📤 Share", url)]);
    }
    InlineKeyboardMarkup::new(rows)
}

fn web_url(s: &str) -> Option<Url> {
    Url::parse(s.trim())
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https" | "tg"))
}

fn share_url(m: &Movie) -> Option<Url> {
    let link = m
        .telegram_link
        .as_deref()
        .or(m.download_link.as_deref())
        .and_then(web_url)?;
    let raw = format!(
        "https://t.me/share/url?url={}&text={}",
        urlencoding::encode(link.as_str()),
        urlencoding::encode(&format!("🎬 {}", m.name)),
    );
    Url::parse(&raw).ok()
}

/* ====== Тексты ====== */

pub fn movie_emoji(m: &Movie) -> &'static str {
    m.categories
        .iter()
        .next()
        .and_then(|first| CATEGORIES.iter().find(|(_, name)| name.eq_ignore_ascii_case(first)))
        .map(|(emoji, _)| *emoji)
        .unwrap_or("🎬")
}

/// Карточка фильма (HTML), укладывается в подпись к фото.
pub fn movie_details(m: &Movie) -> String {
    let mut out = format!("🎬 <b>{}</b>", html_escape(&m.name));
    if !m.visible {
        out.push_str(" <i>(hidden)</i>");
    }
    if !m.categories.is_empty() {
        let tags: Vec<String> = m.categories.iter().map(|c| format!("#{}", hashtag(c))).collect();
        out.push_str(&format!("\n\n🎭 {}", html_escape(&tags.join(" "))));
    }
    // описание режем до экранирования, чтобы не разрезать сущность
    let budget = CAPTION_LIMIT.saturating_sub(out.graphemes(true).count() + 64);
    match m.description.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(d) => out.push_str(&format!("\n\n📝 {}", html_escape(&clip(d, budget)))),
        None => out.push_str("\n\n<i>no description</i>"),
    }
    out.push_str("\n\n⭐️ Share this movie with friends!");
    out
}

pub fn owner_info(config: &Config) -> String {
    format!("👤 Bot Owner ID: <code>{}</code>\nContact the owner for any queries.", config.owner_id.0)
}

pub fn search_results_header(total: usize) -> String {
    if total > PAGE_SIZE {
        format!("🔍 Found {total} matching movies, showing the first {PAGE_SIZE}. Refine the query to see the rest:")
    } else {
        format!("🔍 Found {total} matching movie(s):")
    }
}

pub fn not_found_text() -> &'static str {
    "😕 I don't have this movie yet, please check back in 24 hours."
}

pub fn audit_text(user_id: u64, username: Option<&str>, query: &str, at: chrono::DateTime<chrono::Utc>) -> String {
    let who = match username {
        Some(u) => format!("@{} ({user_id})", html_escape(u)),
        None => user_id.to_string(),
    };
    format!(
        "🔎 <b>Movie not found</b>\nUser: {who}\nQuery: <code>{}</code>\nTime: {}",
        html_escape(query),
        at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
    )
}

fn hashtag(category: &str) -> String {
    category.chars().filter(|c| c.is_alphanumeric() || *c == '_').collect()
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Обрезка по графемам, чтобы не разрезать эмодзи пополам.
pub fn clip(s: &str, max: usize) -> String {
    if s.graphemes(true).count() <= max {
        s.to_string()
    } else {
        s.graphemes(true).take(max.saturating_sub(1)).collect::<String>() + "…"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::InlineKeyboardButtonKind;

    fn movie(id: u64, name: &str) -> Movie {
        Movie {
            id,
            name: name.to_string(),
            description: None,
            poster_url: None,
            download_link: None,
            telegram_link: None,
            categories: BTreeSet::new(),
            visible: true,
        }
    }

    #[test]
    fn tokens_parse_back() {
        let all = vec![
            Callback::Cancel,
            Callback::Search,
            Callback::Flow(FlowButton::Skip),
            Callback::Flow(FlowButton::CategoriesDone),
            Callback::Flow(FlowButton::Category("Sci-Fi".into())),
            Callback::Flow(FlowButton::Pick(3)),
            Callback::Flow(FlowButton::Confirm(3)),
            Callback::Flow(FlowButton::Decline),
            Callback::Menu(MenuItem::Recommend),
            Callback::Browse("Action".into()),
            Callback::Movie(12),
            Callback::Visibility(12),
            Callback::Flow(FlowButton::Page(2)),
            Callback::Page(ListKind::Recommend, 1),
            Callback::Page(ListKind::Owner, 0),
            Callback::Page(ListKind::Category("Sci-Fi".into()), 3),
        ];
        for cb in all {
            assert_eq!(Callback::parse(&cb.token()), Some(cb.clone()), "{}", cb.token());
        }
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert_eq!(Callback::parse(""), None);
        assert_eq!(Callback::parse("movie:abc"), None);
        assert_eq!(Callback::parse("delyes"), None);
        assert_eq!(Callback::parse("menu:unknown"), None);
        assert_eq!(Callback::parse("add:5"), None);
        assert_eq!(Callback::parse("delpage:x"), None);
        assert_eq!(Callback::parse("page_cat:2"), None);
    }

    fn catalog(n: u64) -> Vec<Movie> {
        (1..=n).map(|id| movie(id, &format!("Movie {id}"))).collect()
    }

    fn tokens(kb: &InlineKeyboardMarkup) -> Vec<String> {
        kb.inline_keyboard
            .iter()
            .flatten()
            .filter_map(|b| match &b.kind {
                InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    fn next_page(kb: &InlineKeyboardMarkup, current: usize) -> Option<Callback> {
        tokens(kb)
            .iter()
            .filter_map(|t| Callback::parse(t))
            .find(|cb| match cb {
                Callback::Flow(FlowButton::Page(n)) | Callback::Page(_, n) => *n > current,
                _ => false,
            })
    }

    #[test]
    fn every_movie_can_be_picked_for_deletion() {
        let movies = catalog(60);
        let mut page = 0;
        let mut seen = BTreeSet::new();
        loop {
            let kb = delete_picker(&movies, page);
            assert!(kb.inline_keyboard.iter().flatten().count() <= 100);
            for t in tokens(&kb) {
                if let Some(Callback::Flow(FlowButton::Pick(id))) = Callback::parse(&t) {
                    seen.insert(id);
                }
            }
            match next_page(&kb, page) {
                Some(Callback::Flow(FlowButton::Page(n))) => page = n,
                _ => break,
            }
        }
        assert_eq!(page, 2);
        assert!(seen.contains(&55));
        assert_eq!(seen.len(), 60);
        assert!(tokens(&delete_picker(&movies, 2)).contains(&"delpick:55".to_string()));
    }

    #[test]
    fn pages_link_back_and_clamp() {
        let movies = catalog(45);
        let first = tokens(&movie_list(&movies, 0, Some(ListKind::Recommend)));
        assert!(first.contains(&"page_rec:1".to_string()));
        assert!(!first.iter().any(|t| t == "page_rec:0"));

        let last = tokens(&movie_list(&movies, 99, Some(ListKind::Recommend)));
        assert!(last.contains(&"movie:45".to_string()));
        assert!(last.contains(&"page_rec:1".to_string()));
        assert!(!last.iter().any(|t| t == "page_rec:3"));

        // без вида списка листать нельзя: только первая страница
        let search = tokens(&movie_list(&movies, 0, None));
        assert_eq!(search.len(), PAGE_SIZE);
        assert!(!search.iter().any(|t| t.starts_with("page_")));
    }

    #[test]
    fn owner_list_pages_stay_under_button_limit() {
        let movies = catalog(150);
        let kb = owner_list(&movies, page_of(&movies, 101));
        assert!(kb.inline_keyboard.iter().flatten().count() <= 100);
        let t = tokens(&kb);
        assert!(t.contains(&"vis:101".to_string()));
        assert!(t.contains(&"page_own:4".to_string()));
        assert!(t.contains(&"page_own:6".to_string()));
        assert!(delete_picker(&[], 0).inline_keyboard.len() == 1);
    }

    #[test]
    fn search_header_reports_what_is_shown() {
        assert_eq!(search_results_header(3), "🔍 Found 3 matching movie(s):");
        let long = search_results_header(73);
        assert!(long.contains("73"));
        assert!(long.contains(&format!("first {PAGE_SIZE}")));
    }

    #[test]
    fn tokens_fit_telegram_limit() {
        for (_, name) in CATEGORIES {
            assert!(Callback::Flow(FlowButton::Category(name.to_string())).token().len() <= 64);
            assert!(Callback::Browse(name.to_string()).token().len() <= 64);
            assert!(Callback::Page(ListKind::Category(name.to_string()), 9_999).token().len() <= 64);
        }
    }

    #[test]
    fn emoji_follows_first_category() {
        let mut m = movie(1, "Nova");
        assert_eq!(movie_emoji(&m), "🎬");
        m.categories.insert("Horror".into());
        assert_eq!(movie_emoji(&m), "👻");
    }

    #[test]
    fn details_are_escaped_and_clipped() {
        let mut m = movie(1, "Tom & <Jerry>");
        m.description = Some("x".repeat(5_000));
        m.categories.insert("Sci-Fi".into());
        let text = movie_details(&m);
        assert!(text.contains("Tom &amp; &lt;Jerry&gt;"));
        assert!(text.contains("#SciFi"));
        assert!(text.graphemes(true).count() <= CAPTION_LIMIT);
    }

    #[test]
    fn invalid_links_get_no_buttons() {
        let mut m = movie(1, "Nova");
        m.download_link = Some("not a link".into());
        assert!(movie_buttons(&m).inline_keyboard.is_empty());

        m.download_link = Some("https://dl.example/nova".into());
        let kb = movie_buttons(&m);
        assert_eq!(kb.inline_keyboard.len(), 2);
    }

    #[test]
    fn clip_respects_graphemes() {
        assert_eq!(clip("abc", 5), "abc");
        assert_eq!(clip("🎬🎬🎬🎬", 3), "🎬🎬…");
    }

    #[test]
    fn audit_mentions_user_and_query() {
        let at = chrono::DateTime::parse_from_rfc3339("2026-10-16T12:00:00Z").unwrap().with_timezone(&chrono::Utc);
        let text = audit_text(42, Some("neo"), "matrix <4>", at);
        assert!(text.contains("@neo (42)"));
        assert!(text.contains("matrix &lt;4&gt;"));
        assert!(text.contains("2026-10-16T12:00:00Z"));
    }
}
