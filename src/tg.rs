use crate::config::Config;
use crate::flow::{self, Context, Effect, Event, Session};
use crate::poster::PosterValidator;
use crate::sessions::SessionManager;
use crate::storage::{Catalog, VisibilityChange};
use crate::view::{self, html_escape, Callback, ListKind, MenuItem};
use std::{collections::VecDeque, sync::Arc};
use teloxide::{
    dispatching::{Dispatcher, UpdateFilterExt},
    prelude::*,
    types::{CallbackQuery, ChatId, InlineKeyboardMarkup, InputFile, ParseMode, User},
    utils::command::BotCommands,
};
use tracing::{debug, info, warn};

const TRY_AGAIN: &str = "⚠️ Something went wrong on our side. Please try again.";
const NOT_FOUND: &str = "Movie not found!";
const UNKNOWN_COMMAND: &str = "🤷 Unknown command. See /help for what I can do.";

/// Зависимости обработчиков. Собирается один раз в `main`.
#[derive(Clone)]
pub struct App {
    pub config: Arc<Config>,
    pub catalog: Catalog,
    pub sessions: SessionManager,
    pub posters: PosterValidator,
}

impl App {
    fn context(&self, user: &User) -> Context {
        Context { is_owner: self.config.is_owner(user.id) }
    }
}

/* ====== Команды ====== */
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Commands:")]
enum Command {
    #[command(description = "main menu")]
    Start,
    #[command(description = "how to use the bot")]
    Help,
    #[command(description = "search a movie by name")]
    Search(String),
    #[command(description = "stop the current dialog")]
    Cancel,
    #[command(description = "add a movie (owner)")]
    AddMovie,
    #[command(description = "delete a movie (owner)")]
    DelMovie,
    #[command(description = "list all movies (owner)")]
    ListMovies,
    #[command(description = "hide a movie by id (owner)")]
    Hide(String),
    #[command(description = "show a hidden movie by id (owner)")]
    Show(String),
}

pub async fn run(bot: Bot, app: App) {
    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint({
                            let app = app.clone();
                            move |bot: Bot, msg: Message, cmd: Command| {
                                let app = app.clone();
                                async move { on_command(bot, msg, cmd, &app).await }
                            }
                        })
                )
                .branch({
                    let app = app.clone();
                    dptree::endpoint(move |bot: Bot, msg: Message| {
                        let app = app.clone();
                        async move { on_message(bot, msg, &app).await }
                    })
                })
        )
        .branch(
            Update::filter_callback_query().endpoint({
                let app = app.clone();
                move |bot: Bot, q: CallbackQuery| {
                    let app = app.clone();
                    async move { on_callback(bot, q, &app).await }
                }
            })
        );

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!(error = %e, "failed to register bot commands");
    }
    info!("bot started");

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn on_command(bot: Bot, msg: Message, cmd: Command, app: &App) -> ResponseResult<()> {
    let Some(user) = msg.from.clone() else { return Ok(()); };
    let chat = msg.chat.id;
    debug!(user = user.id.0, command = ?cmd, "command");

    match cmd {
        Command::Start => {
            // /start обрывает любой начатый диалог
            app.sessions.clear(user.id).await;
            send_with_photo(
                &bot,
                chat,
                app.config.welcome_image_url.as_deref(),
                view::WELCOME_TEXT,
                view::main_menu(&app.config),
            )
            .await?;
        }
        Command::Help => send_html(&bot, chat, view::HELP_TEXT, None).await?,
        Command::Search(query) if !query.trim().is_empty() => {
            // запрос сразу в команде: ищем без диалога
            perform(&bot, app, chat, &user, Effect::RunSearch(query.trim().to_string())).await?;
        }
        Command::Search(_) => drive(&bot, app, chat, &user, Event::StartSearch).await?,
        Command::Cancel => drive(&bot, app, chat, &user, Event::Cancel).await?,
        Command::AddMovie => drive(&bot, app, chat, &user, Event::StartAdd).await?,
        Command::DelMovie => drive(&bot, app, chat, &user, Event::StartDelete).await?,
        Command::ListMovies => {
            if owner_only(&bot, app, chat, &user).await? {
                send_owner_list(&bot, app, chat).await?;
            }
        }
        Command::Hide(arg) => {
            if owner_only(&bot, app, chat, &user).await? {
                set_visibility(&bot, app, chat, &arg, false).await?;
            }
        }
        Command::Show(arg) => {
            if owner_only(&bot, app, chat, &user).await? {
                set_visibility(&bot, app, chat, &arg, true).await?;
            }
        }
    }
    Ok(())
}

/* ====== Прочие сообщения ====== */

/// Сообщение, которое не разобралось как команда этого бота.
#[derive(Debug, PartialEq, Eq)]
enum Incoming {
    UnknownCommand,
    Flow(Event),
}

fn incoming(text: Option<&str>) -> Incoming {
    match text {
        // чужие и опечатанные команды не должны стать названием или запросом
        Some(t) if t.trim_start().starts_with('/') => Incoming::UnknownCommand,
        Some(t) => Incoming::Flow(Event::Text(t.to_string())),
        None => Incoming::Flow(Event::NonText),
    }
}

async fn on_message(bot: Bot, msg: Message, app: &App) -> ResponseResult<()> {
    let Some(user) = msg.from.clone() else { return Ok(()); };
    match incoming(msg.text()) {
        Incoming::UnknownCommand => {
            bot.send_message(msg.chat.id, UNKNOWN_COMMAND).await?;
            Ok(())
        }
        Incoming::Flow(event) => drive(&bot, app, msg.chat.id, &user, event).await,
    }
}

/* ====== Callback-кнопки ====== */
async fn on_callback(bot: Bot, q: CallbackQuery, app: &App) -> ResponseResult<()> {
    let Some(data) = q.data.clone() else { return Ok(()); };
    let Some(chat) = q.message.as_ref().map(|m| m.chat().id) else {
        answer_cb(&bot, &q, "This message is too old").await?;
        return Ok(());
    };
    let Some(cb) = Callback::parse(&data) else {
        warn!(data = %data, "unknown callback token");
        answer_cb(&bot, &q, "Unknown button").await?;
        return Ok(());
    };
    bot.answer_callback_query(q.id.clone()).await?;
    let user = q.from.clone();

    match cb {
        Callback::Cancel => drive(&bot, app, chat, &user, Event::Cancel).await?,
        Callback::Search => drive(&bot, app, chat, &user, Event::StartSearch).await?,
        Callback::Flow(button) => drive(&bot, app, chat, &user, Event::Button(button)).await?,
        Callback::Menu(MenuItem::Owner) => send_html(&bot, chat, &view::owner_info(&app.config), None).await?,
        Callback::Menu(MenuItem::Help) => send_html(&bot, chat, view::HELP_TEXT, None).await?,
        Callback::Menu(MenuItem::Categories) => {
            send_html(&bot, chat, "📚 Choose a category:", Some(view::categories_menu())).await?
        }
        Callback::Menu(MenuItem::Recommend) => {
            let movies = app.catalog.list(false).await;
            if movies.is_empty() {
                bot.send_message(chat, "No movies available yet!").await?;
            } else {
                let kb = view::movie_list(&movies, 0, Some(ListKind::Recommend));
                send_html(&bot, chat, "🎲 Here are all available movies:", Some(kb)).await?;
            }
        }
        Callback::Browse(category) => {
            let movies = app.catalog.list_by_category(&category).await;
            if movies.is_empty() {
                bot.send_message(chat, format!("No {category} movies yet.")).await?;
            } else {
                let header = format!("🎭 {} movies:", html_escape(&category));
                let kb = view::movie_list(&movies, 0, Some(ListKind::Category(category)));
                send_html(&bot, chat, &header, Some(kb)).await?;
            }
        }
        Callback::Page(list, page) => {
            if list == ListKind::Owner && !owner_only(&bot, app, chat, &user).await? {
                return Ok(());
            }
            let kb = match &list {
                ListKind::Recommend => view::movie_list(&app.catalog.list(false).await, page, Some(list.clone())),
                ListKind::Category(category) => {
                    let movies = app.catalog.list_by_category(category).await;
                    view::movie_list(&movies, page, Some(list.clone()))
                }
                ListKind::Owner => view::owner_list(&app.catalog.list(true).await, page),
            };
            replace_markup(&bot, &q, chat, kb).await;
        }
        Callback::Movie(id) => show_movie(&bot, app, chat, id).await?,
        Callback::Visibility(id) => {
            if owner_only(&bot, app, chat, &user).await? {
                toggle_from_list(&bot, app, &q, chat, id).await?;
            }
        }
    }
    Ok(())
}

/* ====== Машина состояний ======
   событие -> переход -> эффекты; эффект может вернуть следующее событие
   (результат проверки постера), оно обрабатывается в том же цикле. */
async fn drive(bot: &Bot, app: &App, chat: ChatId, user: &User, event: Event) -> ResponseResult<()> {
    let ctx = app.context(user);
    let mut pending = VecDeque::from([event]);
    while let Some(event) = pending.pop_front() {
        let session = app.sessions.get(user.id).await;
        let outcome = flow::transition(&session, &ctx, event);
        if outcome.next != session {
            debug!(user = user.id.0, from = ?session, to = ?outcome.next, "session moved");
        }
        app.sessions.store(user.id, outcome.next).await;
        for effect in outcome.effects {
            if let Some(follow_up) = perform(bot, app, chat, user, effect).await? {
                pending.push_back(follow_up);
            }
        }
    }
    Ok(())
}

async fn perform(
    bot: &Bot,
    app: &App,
    chat: ChatId,
    user: &User,
    effect: Effect,
) -> ResponseResult<Option<Event>> {
    match effect {
        Effect::Reply(prompt) => {
            let (text, kb) = view::prompt(&prompt);
            send_html(bot, chat, &text, kb).await?;
        }
        Effect::ValidatePoster(url) => {
            let valid = app.posters.is_valid(&url).await;
            return Ok(Some(Event::PosterChecked { url, valid }));
        }
        Effect::CreateMovie(movie) => {
            let name = movie.name.clone();
            match app.catalog.create(movie).await {
                Some(id) => {
                    let text = format!("✅ Movie <b>{}</b> added successfully (#{id}).", html_escape(&name));
                    send_html(bot, chat, &text, None).await?;
                }
                None => {
                    bot.send_message(chat, TRY_AGAIN).await?;
                }
            }
        }
        Effect::RunSearch(query) => run_search(bot, app, chat, user, &query).await?,
        Effect::ShowDeletePicker { page } => {
            let movies = app.catalog.list(true).await;
            let text = if movies.is_empty() {
                "📭 The catalog is empty, nothing to delete."
            } else {
                "🗑 Select the movie to delete:"
            };
            send_html(bot, chat, text, Some(view::delete_picker(&movies, page))).await?;
        }
        Effect::AskDeleteConfirmation(id) => match app.catalog.get(id).await {
            Some(movie) => {
                let text = format!(
                    "⚠️ Delete <b>{}</b> (#{id})? This cannot be undone.",
                    html_escape(&movie.name)
                );
                send_html(bot, chat, &text, Some(view::delete_confirmation(id))).await?;
            }
            None => {
                // нечего подтверждать: диалог закончен
                app.sessions.clear(user.id).await;
                bot.send_message(chat, NOT_FOUND).await?;
            }
        },
        Effect::DeleteMovie(id) => {
            let text = if app.catalog.delete(id).await {
                format!("🗑 Movie #{id} deleted.")
            } else if app.catalog.get(id).await.is_none() {
                NOT_FOUND.to_string()
            } else {
                TRY_AGAIN.to_string()
            };
            bot.send_message(chat, text).await?;
        }
    }
    Ok(None)
}

/* ====== Поиск ====== */
async fn run_search(bot: &Bot, app: &App, chat: ChatId, user: &User, query: &str) -> ResponseResult<()> {
    let movies = app.catalog.search(query).await;
    if movies.is_empty() {
        bot.send_message(chat, view::not_found_text()).await?;
        notify_not_found(bot, app, user, query).await;
        return Ok(());
    }
    let header = view::search_results_header(movies.len());
    send_html(bot, chat, &header, Some(view::movie_list(&movies, 0, None))).await
}

/// Неудачный поиск уходит в лог-чат. Ошибка доставки на поиск не влияет.
async fn notify_not_found(bot: &Bot, app: &App, user: &User, query: &str) {
    let Some(log_chat) = app.config.log_chat_id else { return; };
    let text = view::audit_text(user.id.0, user.username.as_deref(), query, chrono::Utc::now());
    if let Err(e) = bot.send_message(log_chat, text).parse_mode(ParseMode::Html).await {
        warn!(error = %e, "failed to notify log chat");
    }
}

/* ====== Карточка фильма и владелец ====== */
async fn show_movie(bot: &Bot, app: &App, chat: ChatId, id: u64) -> ResponseResult<()> {
    let Some(movie) = app.catalog.get(id).await else {
        bot.send_message(chat, NOT_FOUND).await?;
        return Ok(());
    };
    let text = view::movie_details(&movie);
    send_with_photo(bot, chat, movie.poster_url.as_deref(), &text, view::movie_buttons(&movie)).await
}

async fn owner_only(bot: &Bot, app: &App, chat: ChatId, user: &User) -> ResponseResult<bool> {
    if app.config.is_owner(user.id) {
        return Ok(true);
    }
    // чужой не должен продолжить диалог владельца
    if app.sessions.get(user.id).await != Session::Idle {
        app.sessions.clear(user.id).await;
    }
    let (text, _) = view::prompt(&flow::Prompt::OwnerOnly);
    bot.send_message(chat, text).await?;
    Ok(false)
}

async fn send_owner_list(bot: &Bot, app: &App, chat: ChatId) -> ResponseResult<()> {
    let movies = app.catalog.list(true).await;
    if movies.is_empty() {
        bot.send_message(chat, "📭 The catalog is empty.").await?;
        return Ok(());
    }
    let hidden = movies.iter().filter(|m| !m.visible).count();
    let text = format!("📋 <b>All movies ({}), hidden: {hidden}</b>", movies.len());
    send_html(bot, chat, &text, Some(view::owner_list(&movies, 0))).await
}

async fn set_visibility(bot: &Bot, app: &App, chat: ChatId, arg: &str, visible: bool) -> ResponseResult<()> {
    let Ok(id) = arg.trim().parse::<u64>() else {
        let usage = if visible { "Usage: /show <id>" } else { "Usage: /hide <id>" };
        bot.send_message(chat, usage).await?;
        return Ok(());
    };
    let text = match (app.catalog.set_visibility(id, visible).await, visible) {
        (VisibilityChange::Changed, true) => format!("👁 Movie #{id} is visible again."),
        (VisibilityChange::Changed, false) => format!("🙈 Movie #{id} is now hidden."),
        (VisibilityChange::Unchanged, true) => format!("Movie #{id} is already visible."),
        (VisibilityChange::Unchanged, false) => format!("Movie #{id} is already hidden."),
        (VisibilityChange::NotFound, _) => NOT_FOUND.to_string(),
        (VisibilityChange::Failed, _) => TRY_AGAIN.to_string(),
    };
    bot.send_message(chat, text).await?;
    Ok(())
}

/// Кнопка Hide/Show в /listmovies: переключаем и перерисовываем список.
async fn toggle_from_list(bot: &Bot, app: &App, q: &CallbackQuery, chat: ChatId, id: u64) -> ResponseResult<()> {
    if !app.catalog.toggle_visibility(id).await {
        let text = if app.catalog.get(id).await.is_none() { NOT_FOUND } else { TRY_AGAIN };
        bot.send_message(chat, text).await?;
        return Ok(());
    }
    let movies = app.catalog.list(true).await;
    let page = view::page_of(&movies, id);
    replace_markup(bot, q, chat, view::owner_list(&movies, page)).await;
    Ok(())
}

/// Перерисовывает клавиатуру под сообщением, где нажали кнопку.
async fn replace_markup(bot: &Bot, q: &CallbackQuery, chat: ChatId, kb: InlineKeyboardMarkup) {
    let Some(message_id) = q.message.as_ref().map(|m| m.id()) else { return; };
    if let Err(e) = bot.edit_message_reply_markup(chat, message_id).reply_markup(kb).await {
        warn!(error = %e, "failed to refresh list keyboard");
    }
}

/* ====== Отправка ====== */

async fn send_html(bot: &Bot, chat: ChatId, text: &str, kb: Option<InlineKeyboardMarkup>) -> ResponseResult<()> {
    let req = bot.send_message(chat, text).parse_mode(ParseMode::Html);
    match kb {
        Some(kb) => req.reply_markup(kb).await?,
        None => req.await?,
    };
    Ok(())
}

/// Фото с подписью; если Telegram не смог забрать картинку, шлём тот же текст без неё.
async fn send_with_photo(
    bot: &Bot,
    chat: ChatId,
    photo_url: Option<&str>,
    caption: &str,
    kb: InlineKeyboardMarkup,
) -> ResponseResult<()> {
    if let Some(url) = photo_url.and_then(|u| reqwest::Url::parse(u.trim()).ok()) {
        let sent = bot
            .send_photo(chat, InputFile::url(url))
            .caption(caption)
            .parse_mode(ParseMode::Html)
            .reply_markup(kb.clone())
            .await;
        match sent {
            Ok(_) => return Ok(()),
            Err(e) => warn!(error = %e, "photo delivery failed, falling back to text"),
        }
    }
    send_html(bot, chat, caption, Some(kb)).await
}

async fn answer_cb(bot: &Bot, q: &CallbackQuery, text: &str) -> ResponseResult<()> {
    bot.answer_callback_query(q.id.clone())
        .text(text)
        .show_alert(false)
        .await?;
    Ok(())
}
