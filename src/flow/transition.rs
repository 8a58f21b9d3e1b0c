use super::{AddStep, DeleteStep, Draft, Effect, Event, FlowButton, Prompt, Session};

/// Кто прислал событие.
#[derive(Debug, Clone, Copy)]
pub struct Context {
    pub is_owner: bool,
}

#[derive(Debug)]
pub struct Transition {
    pub next: Session,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn to(next: Session) -> Self {
        Self { next, effects: Vec::new() }
    }

    fn idle() -> Self {
        Self::to(Session::Idle)
    }

    fn with(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    fn reply(self, prompt: Prompt) -> Self {
        self.with(Effect::Reply(prompt))
    }
}

pub fn transition(session: &Session, ctx: &Context, event: Event) -> Transition {
    match (session, event) {
        // входы в диалоги работают из любого состояния, старый черновик теряется
        (_, Event::StartAdd) => {
            if !ctx.is_owner {
                return rejected();
            }
            adding(AddStep::Name, Draft::default()).reply(Prompt::AskName)
        }
        (_, Event::StartSearch) => Transition::to(Session::Searching).reply(Prompt::AskQuery),
        (_, Event::StartDelete) => {
            if !ctx.is_owner {
                return rejected();
            }
            Transition::to(Session::Deleting(DeleteStep::Selection)).with(Effect::ShowDeletePicker { page: 0 })
        }

        (Session::Idle, Event::Cancel) => Transition::idle().reply(Prompt::NothingToCancel),
        (_, Event::Cancel) => Transition::idle().reply(Prompt::Cancelled),

        (Session::Adding { step, draft }, event) => on_adding(*step, draft, ctx, event),
        (Session::Searching, event) => on_searching(event),
        (Session::Deleting(step), event) => on_deleting(*step, ctx, event),

        (Session::Idle, Event::Text(_)) => Transition::idle().reply(Prompt::IdleHint),
        (Session::Idle, Event::Button(_)) => Transition::idle().reply(Prompt::Expired),
        (Session::Idle, Event::PosterChecked { .. } | Event::NonText) => Transition::idle(),
    }
}

fn rejected() -> Transition {
    Transition::idle().reply(Prompt::OwnerOnly)
}

fn adding(step: AddStep, draft: Draft) -> Transition {
    Transition::to(Session::Adding { step, draft })
}

fn step_prompt(step: AddStep, draft: &Draft) -> Prompt {
    match step {
        AddStep::Name => Prompt::AskName,
        AddStep::Description => Prompt::AskDescription,
        AddStep::Poster => Prompt::AskPoster,
        AddStep::DownloadLink => Prompt::AskDownloadLink,
        AddStep::ChannelLink => Prompt::AskChannelLink,
        AddStep::Categories => Prompt::AskCategories { selected: draft.categories.clone() },
    }
}

fn advance(step: AddStep, draft: Draft) -> Transition {
    let prompt = step_prompt(step, &draft);
    adding(step, draft).reply(prompt)
}

fn non_blank(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn on_adding(step: AddStep, draft: &Draft, ctx: &Context, event: Event) -> Transition {
    // повторная проверка владельца на каждом шаге
    if !ctx.is_owner {
        return rejected();
    }
    let mut draft = draft.clone();
    match (step, event) {
        (AddStep::Name, Event::Text(text)) => match non_blank(&text) {
            Some(name) => {
                draft.name = Some(name);
                advance(AddStep::Description, draft)
            }
            None => advance(AddStep::Name, draft),
        },

        (AddStep::Description, Event::Text(text)) => {
            draft.description = non_blank(&text);
            advance(AddStep::Poster, draft)
        }
        (AddStep::Description, Event::Button(FlowButton::Skip)) => advance(AddStep::Poster, draft),

        (AddStep::Poster, Event::Text(text)) => match non_blank(&text) {
            Some(url) => adding(AddStep::Poster, draft)
                .reply(Prompt::CheckingPoster)
                .with(Effect::ValidatePoster(url)),
            None => advance(AddStep::Poster, draft),
        },
        (AddStep::Poster, Event::PosterChecked { url, valid: true }) => {
            draft.poster_url = Some(url);
            advance(AddStep::DownloadLink, draft)
        }
        (AddStep::Poster, Event::PosterChecked { valid: false, .. }) => {
            adding(AddStep::Poster, draft).reply(Prompt::InvalidPoster)
        }
        (AddStep::Poster, Event::Button(FlowButton::Skip)) => advance(AddStep::DownloadLink, draft),

        (AddStep::DownloadLink, Event::Text(text)) => {
            draft.download_link = non_blank(&text);
            advance(AddStep::ChannelLink, draft)
        }
        (AddStep::DownloadLink, Event::Button(FlowButton::Skip)) => advance(AddStep::ChannelLink, draft),

        (AddStep::ChannelLink, Event::Text(text)) => {
            draft.telegram_link = non_blank(&text);
            advance(AddStep::Categories, draft)
        }
        (AddStep::ChannelLink, Event::Button(FlowButton::Skip)) => advance(AddStep::Categories, draft),

        (AddStep::Categories, Event::Button(FlowButton::Category(name))) => {
            draft.categories.insert(name);
            advance(AddStep::Categories, draft)
        }
        (AddStep::Categories, Event::Button(FlowButton::CategoriesDone)) => match draft.into_new_movie() {
            Some(movie) => Transition::idle().with(Effect::CreateMovie(movie)),
            None => Transition::idle().reply(Prompt::MissingName),
        },

        // устаревший результат проверки постера
        (step, Event::PosterChecked { .. }) => adding(step, draft),

        // событие не той формы: остаёмся на месте и переспрашиваем
        (step, _) => advance(step, draft),
    }
}

fn on_searching(event: Event) -> Transition {
    match event {
        Event::Text(query) => match non_blank(&query) {
            Some(query) => Transition::idle().with(Effect::RunSearch(query)),
            None => Transition::to(Session::Searching).reply(Prompt::AskQuery),
        },
        Event::PosterChecked { .. } => Transition::to(Session::Searching),
        _ => Transition::to(Session::Searching).reply(Prompt::AskQuery),
    }
}

fn on_deleting(step: DeleteStep, ctx: &Context, event: Event) -> Transition {
    if !ctx.is_owner {
        return rejected();
    }
    let confirming = |id| {
        Transition::to(Session::Deleting(DeleteStep::Confirmation { id }))
            .with(Effect::AskDeleteConfirmation(id))
    };
    match (step, event) {
        // выбор только переводит к подтверждению, удаления тут нет
        (_, Event::Button(FlowButton::Pick(id))) => confirming(id),
        (DeleteStep::Selection, Event::Button(FlowButton::Page(page))) => {
            Transition::to(Session::Deleting(DeleteStep::Selection)).with(Effect::ShowDeletePicker { page })
        }
        (DeleteStep::Confirmation { id }, Event::Button(FlowButton::Confirm(confirmed))) if confirmed == id => {
            Transition::idle().with(Effect::DeleteMovie(id))
        }
        (_, Event::Button(FlowButton::Decline)) => Transition::idle().reply(Prompt::DeleteDeclined),
        // текста здесь не ждём: считаем диалог брошенным
        (_, Event::Text(_)) => Transition::idle(),
        (step, Event::PosterChecked { .. }) => Transition::to(Session::Deleting(step)),
        (DeleteStep::Selection, _) => {
            Transition::to(Session::Deleting(DeleteStep::Selection)).with(Effect::ShowDeletePicker { page: 0 })
        }
        (DeleteStep::Confirmation { id }, _) => confirming(id),
    }
}
