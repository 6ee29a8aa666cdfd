use std::io::{self, Stdout};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Local;
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap};
use ratatui::{Frame, Terminal};
use textwrap::{wrap, Options as WrapOptions};
use unicode_width::UnicodeWidthStr;
use url::Url;

use crate::api::{
    ApiResult, AuthResponse, Comment, GalleryImage, LikeResponse, MeResponse, ProfileInfo,
};
use crate::data::Services;
use crate::notify::Level;
use crate::page::{Modal, Page};
use crate::render::{self, Node};
use crate::session::Session;

#[derive(Debug, Clone, Copy)]
struct Palette {
    bg: Color,
    panel_bg: Color,
    border_idle: Color,
    border_focused: Color,
    text_primary: Color,
    text_secondary: Color,
    accent: Color,
    success: Color,
    error: Color,
    heart: Color,
}

impl Palette {
    fn from_theme(name: &str) -> Self {
        match name {
            "mono" => Self {
                bg: Color::Reset,
                panel_bg: Color::Reset,
                border_idle: Color::Reset,
                border_focused: Color::Reset,
                text_primary: Color::Reset,
                text_secondary: Color::Reset,
                accent: Color::Reset,
                success: Color::Reset,
                error: Color::Reset,
                heart: Color::Reset,
            },
            _ => Self {
                bg: Color::Rgb(30, 30, 46),
                panel_bg: Color::Rgb(24, 24, 36),
                border_idle: Color::Rgb(49, 50, 68),
                border_focused: Color::Rgb(137, 180, 250),
                text_primary: Color::Rgb(205, 214, 244),
                text_secondary: Color::Rgb(166, 173, 200),
                accent: Color::Rgb(137, 180, 250),
                success: Color::Rgb(166, 227, 161),
                error: Color::Rgb(243, 139, 168),
                heart: Color::Rgb(255, 107, 157),
            },
        }
    }

    fn level(&self, level: Level) -> Color {
        match level {
            Level::Success => self.success,
            Level::Error => self.error,
            Level::Info => self.heart,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Comments,
    Videos,
    Gallery,
}

impl Section {
    const ALL: [Section; 3] = [Section::Comments, Section::Videos, Section::Gallery];

    fn title(self) -> &'static str {
        match self {
            Section::Comments => "Comments",
            Section::Videos => "Videos",
            Section::Gallery => "Gallery",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }

    fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    fn previous(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

enum AsyncResponse {
    Status(ApiResult<MeResponse>),
    Comments(ApiResult<Vec<Comment>>),
    Profile(ApiResult<ProfileInfo>),
    Gallery(ApiResult<Vec<GalleryImage>>),
    Posted(ApiResult<Comment>),
    Liked(ApiResult<LikeResponse>),
    LoggedIn(ApiResult<AuthResponse>),
    Registered(ApiResult<AuthResponse>),
    LoggedOut(ApiResult<()>),
}

pub struct Options {
    pub page: Page,
    pub services: Services,
    pub base_url: Url,
    pub theme: String,
    pub status_message: String,
}

pub struct Model {
    page: Page,
    services: Services,
    base_url: Url,
    palette: Palette,
    section: Section,
    comment_state: ListState,
    video_state: ListState,
    gallery_state: ListState,
    composing: bool,
    status_message: String,
    pending: usize,
    needs_redraw: bool,
    response_tx: Sender<AsyncResponse>,
    response_rx: Receiver<AsyncResponse>,
}

impl Model {
    pub fn new(opts: Options) -> Self {
        let (response_tx, response_rx) = unbounded();
        Self {
            page: opts.page,
            services: opts.services,
            base_url: opts.base_url,
            palette: Palette::from_theme(&opts.theme),
            section: Section::Comments,
            comment_state: ListState::default(),
            video_state: ListState::default(),
            gallery_state: ListState::default(),
            composing: false,
            status_message: opts.status_message,
            pending: 0,
            needs_redraw: true,
            response_tx,
            response_rx,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        self.request_startup();
        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        let tick_rate = Duration::from_millis(120);

        loop {
            if self.poll_async() {
                self.mark_dirty();
            }

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));

            if event::poll(timeout)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        if self.handle_key(key.code) {
                            break;
                        }
                        self.mark_dirty();
                    }
                }
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
                if self.page.notifier.expire(Instant::now()) {
                    self.mark_dirty();
                }
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn spawn<F>(&mut self, job: F)
    where
        F: FnOnce() -> AsyncResponse + Send + 'static,
    {
        self.pending += 1;
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let _ = tx.send(job());
        });
    }

    fn request_startup(&mut self) {
        let auth = self.services.auth.clone();
        self.spawn(move || AsyncResponse::Status(auth.status()));
        self.request_profile();
        self.request_comments();
        self.request_gallery();
    }

    fn request_comments(&mut self) {
        let comments = self.services.comments.clone();
        self.spawn(move || AsyncResponse::Comments(comments.list()));
    }

    fn request_profile(&mut self) {
        let profile = self.services.profile.clone();
        self.spawn(move || AsyncResponse::Profile(profile.load_info()));
    }

    fn request_gallery(&mut self) {
        let profile = self.services.profile.clone();
        self.spawn(move || AsyncResponse::Gallery(profile.load_gallery()));
    }

    fn poll_async(&mut self) -> bool {
        let mut changed = false;
        while let Ok(message) = self.response_rx.try_recv() {
            self.pending = self.pending.saturating_sub(1);
            self.handle_async_response(message);
            changed = true;
        }
        changed
    }

    fn handle_async_response(&mut self, message: AsyncResponse) {
        let page = &mut self.page;
        match message {
            AsyncResponse::Status(result) => page.session.apply_status(result),
            AsyncResponse::Comments(result) => {
                page.feed.apply_snapshot(result);
                clamp_selection(&mut self.comment_state, page.feed.comments().len());
            }
            AsyncResponse::Profile(result) => {
                page.profile.apply_info(result);
                clamp_selection(&mut self.video_state, page.profile.videos().len());
            }
            AsyncResponse::Gallery(result) => {
                page.profile.apply_gallery(result);
                clamp_selection(&mut self.gallery_state, page.profile.gallery().len());
            }
            AsyncResponse::Posted(result) => {
                if page.apply_posted(result) {
                    self.composing = false;
                    self.request_comments();
                }
            }
            AsyncResponse::Liked(result) => {
                if page.apply_liked(result) {
                    self.request_comments();
                }
            }
            AsyncResponse::LoggedIn(result) => {
                if page.apply_login(result) {
                    self.request_comments();
                }
            }
            AsyncResponse::Registered(result) => {
                page.apply_register(result);
            }
            AsyncResponse::LoggedOut(result) => {
                if page.apply_logout(result) {
                    self.request_comments();
                }
            }
        }
    }

    /// Returns true when the application should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if let Some(modal) = self.page.modal().cloned() {
            self.handle_modal_key(modal, code);
            return false;
        }
        if self.composing {
            self.handle_compose_key(code);
            return false;
        }

        match code {
            KeyCode::Char('q') => return true,
            KeyCode::Tab => self.section = self.section.next(),
            KeyCode::BackTab => self.section = self.section.previous(),
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('r') => match self.section {
                Section::Comments => self.request_comments(),
                Section::Videos => self.request_profile(),
                Section::Gallery => self.request_gallery(),
            },
            KeyCode::Char('l') if self.section == Section::Comments => self.like_selected(),
            KeyCode::Char('i') if self.section == Section::Comments => {
                self.composing = true;
                self.status_message = "Composing: Enter to post, Esc to stop".into();
            }
            KeyCode::Char('L') if !self.page.session.is_logged_in() => {
                self.page.open_modal(Modal::Login)
            }
            KeyCode::Char('R') if !self.page.session.is_logged_in() => {
                self.page.open_modal(Modal::Register)
            }
            KeyCode::Char('X') if self.page.session.is_logged_in() => {
                let auth = self.services.auth.clone();
                self.spawn(move || AsyncResponse::LoggedOut(auth.logout()));
            }
            KeyCode::Enter if self.section == Section::Gallery => {
                if let Some(image) = self.selected_image() {
                    let src = self.resolve(&image.src);
                    self.page.open_modal(Modal::ImagePreview { src });
                }
            }
            KeyCode::Char('o') => self.open_selected(),
            _ => {}
        }
        false
    }

    fn handle_modal_key(&mut self, modal: Modal, code: KeyCode) {
        if code == KeyCode::Esc {
            self.page.close_modal();
            return;
        }
        match modal {
            Modal::Login => match code {
                KeyCode::Tab | KeyCode::Down | KeyCode::Up => self.page.login_form.next(),
                KeyCode::Backspace => self.page.login_form.backspace(),
                KeyCode::Char(ch) => self.page.login_form.insert_char(ch),
                KeyCode::Enter => {
                    let credentials = self.page.begin_login();
                    let auth = self.services.auth.clone();
                    self.spawn(move || AsyncResponse::LoggedIn(auth.login(&credentials)));
                }
                _ => {}
            },
            Modal::Register => match code {
                KeyCode::Tab | KeyCode::Down | KeyCode::Up => self.page.register_form.next(),
                KeyCode::Backspace => self.page.register_form.backspace(),
                KeyCode::Char(ch) => self.page.register_form.insert_char(ch),
                KeyCode::Enter => {
                    if let Some(registration) = self.page.begin_register() {
                        let auth = self.services.auth.clone();
                        self.spawn(move || {
                            AsyncResponse::Registered(auth.register(&registration))
                        });
                    }
                }
                _ => {}
            },
            Modal::ImagePreview { src } => match code {
                KeyCode::Char('q') => self.page.close_modal(),
                KeyCode::Char('o') => self.open_url(&src),
                _ => {}
            },
        }
    }

    fn handle_compose_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.composing = false;
                self.status_message.clear();
            }
            KeyCode::Backspace => self.page.feed.pop_char(),
            KeyCode::Char(ch) => self.page.feed.push_char(ch),
            KeyCode::Enter => {
                if let Some(content) = self.page.begin_submit() {
                    let comments = self.services.comments.clone();
                    self.spawn(move || AsyncResponse::Posted(comments.create(&content)));
                }
            }
            _ => {}
        }
    }

    fn like_selected(&mut self) {
        let Some(id) = self
            .comment_state
            .selected()
            .and_then(|index| self.page.feed.comments().get(index))
            .map(|comment| comment.id)
        else {
            return;
        };
        if !self.page.begin_like() {
            return;
        }
        let comments = self.services.comments.clone();
        self.spawn(move || AsyncResponse::Liked(comments.toggle_like(id)));
    }

    fn move_selection(&mut self, delta: i32) {
        let (state, len) = match self.section {
            Section::Comments => (&mut self.comment_state, self.page.feed.comments().len()),
            Section::Videos => (&mut self.video_state, self.page.profile.videos().len()),
            Section::Gallery => (&mut self.gallery_state, self.page.profile.gallery().len()),
        };
        if len == 0 {
            state.select(None);
            return;
        }
        let current = state.selected().unwrap_or(0) as i64;
        let next = (current + delta as i64).clamp(0, len as i64 - 1);
        state.select(Some(next as usize));
    }

    fn selected_image(&self) -> Option<&GalleryImage> {
        self.gallery_state
            .selected()
            .and_then(|index| self.page.profile.gallery().get(index))
    }

    fn open_selected(&mut self) {
        let url = match self.section {
            Section::Videos => self
                .video_state
                .selected()
                .and_then(|index| self.page.profile.videos().get(index))
                .map(|video| video.url()),
            Section::Gallery => self.selected_image().map(|image| self.resolve(&image.src)),
            Section::Comments => None,
        };
        if let Some(url) = url {
            self.open_url(&url);
        }
    }

    /// Gallery sources may be relative to the site root.
    fn resolve(&self, src: &str) -> String {
        self.base_url
            .join(src)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| src.to_string())
    }

    fn open_url(&mut self, url: &str) {
        match webbrowser::open(url) {
            Ok(()) => self.status_message = format!("Opened {url}"),
            Err(err) => {
                tracing::warn!(error = %err, url, "failed to open browser");
                self.page.notifier.error(format!("Could not open browser: {err}"));
            }
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.size();
        frame.render_widget(
            Block::default().style(Style::default().bg(self.palette.bg)),
            area,
        );
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(area);

        self.draw_header(frame, chunks[0]);
        self.draw_tabs(frame, chunks[1]);
        match self.section {
            Section::Comments => self.draw_comments(frame, chunks[2]),
            Section::Videos => self.draw_videos(frame, chunks[2]),
            Section::Gallery => self.draw_gallery(frame, chunks[2]),
        }
        self.draw_footer(frame, chunks[3]);

        if let Some(modal) = self.page.render_modal() {
            self.draw_modal(frame, area, &modal);
        }
        self.draw_toast(frame, area);
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let palette = self.palette;
        let title = format!("♥ {} Fan Page", self.page.subject_name());
        let auth = node_lines(&render::auth_bar(self.page.session.user()), &palette);
        let mut lines = vec![Line::from(Span::styled(
            title,
            Style::default()
                .fg(palette.heart)
                .add_modifier(Modifier::BOLD),
        ))];
        lines.extend(auth);
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(palette.border_idle));
        frame.render_widget(Paragraph::new(Text::from(lines)).block(block), area);
    }

    fn draw_tabs(&self, frame: &mut Frame, area: Rect) {
        let titles: Vec<Line> = Section::ALL
            .iter()
            .map(|section| Line::from(section.title()))
            .collect();
        let tabs = Tabs::new(titles)
            .select(self.section.index())
            .style(Style::default().fg(self.palette.text_secondary))
            .highlight_style(
                Style::default()
                    .fg(self.palette.accent)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_widget(tabs, area);
    }

    fn draw_comments(&mut self, frame: &mut Frame, area: Rect) {
        let palette = self.palette;
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(5)])
            .split(area);

        let now = Local::now();
        let tree = self.page.feed.render(&now);
        let width = chunks[0].width.saturating_sub(4) as usize;
        let items = list_items(&tree, "comment-item", width, &palette);
        let block = panel_block("Comments", !self.composing, &palette);
        if items.is_empty() {
            let text = Text::from(node_lines(&tree, &palette));
            frame.render_widget(Paragraph::new(text).block(block), chunks[0]);
        } else {
            let list = List::new(items)
                .block(block)
                .highlight_style(Style::default().bg(palette.panel_bg))
                .highlight_symbol("▌ ");
            frame.render_stateful_widget(list, chunks[0], &mut self.comment_state);
        }

        let composer = self.page.feed.render_composer();
        let text = Text::from(node_lines(&composer, &palette));
        let block = panel_block(
            &format!("New comment ({} chars)", self.page.feed.char_count()),
            self.composing,
            &palette,
        );
        frame.render_widget(
            Paragraph::new(text).block(block).wrap(Wrap { trim: false }),
            chunks[1],
        );
    }

    fn draw_videos(&mut self, frame: &mut Frame, area: Rect) {
        let palette = self.palette;
        let tree = self.page.profile.render_videos();
        let width = area.width.saturating_sub(4) as usize;
        let items = list_items(&tree, "video-card-link", width, &palette);
        let list = List::new(items)
            .block(panel_block("Videos (o to watch)", true, &palette))
            .highlight_style(Style::default().bg(palette.panel_bg))
            .highlight_symbol("▌ ");
        frame.render_stateful_widget(list, area, &mut self.video_state);
    }

    fn draw_gallery(&mut self, frame: &mut Frame, area: Rect) {
        let palette = self.palette;
        let tree = self.page.profile.render_gallery();
        let width = area.width.saturating_sub(4) as usize;
        let items = list_items(&tree, "gallery-item", width, &palette);
        let list = List::new(items)
            .block(panel_block("Gallery (Enter to preview)", true, &palette))
            .highlight_style(Style::default().bg(palette.panel_bg))
            .highlight_symbol("▌ ");
        frame.render_stateful_widget(list, area, &mut self.gallery_state);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let mut text = if self.status_message.is_empty() {
            footer_hint(&self.page.session).to_string()
        } else {
            self.status_message.clone()
        };
        if self.pending > 0 {
            text = format!("Loading… {text}");
        }
        let footer = Paragraph::new(text).style(Style::default().fg(self.palette.text_secondary));
        frame.render_widget(footer, area);
    }

    fn draw_modal(&self, frame: &mut Frame, area: Rect, modal: &Node) {
        let palette = self.palette;
        let popup = centered_rect(60, 50, area);
        frame.render_widget(Clear, popup);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.border_focused))
            .title(" Esc to close ")
            .style(Style::default().bg(palette.panel_bg));
        let text = Text::from(node_lines(modal, &palette));
        frame.render_widget(
            Paragraph::new(text).block(block).wrap(Wrap { trim: false }),
            popup,
        );
    }

    fn draw_toast(&self, frame: &mut Frame, area: Rect) {
        let Some(toast) = self.page.notifier.current() else {
            return;
        };
        let palette = self.palette;
        let line = Line::from(node_lines(&render::toast(toast), &palette).concat_spans());
        let width = (line.width() as u16 + 4).min(area.width);
        let popup = Rect {
            x: area.x + area.width.saturating_sub(width + 1),
            y: area.y + 1,
            width,
            height: 3,
        }
        .intersection(area);
        // Too small for a bordered box.
        if popup.height < 3 || popup.width < 3 {
            return;
        }
        frame.render_widget(Clear, popup);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.level(toast.level)))
            .style(Style::default().bg(palette.panel_bg));
        frame.render_widget(Paragraph::new(line).block(block), popup);
    }
}

fn footer_hint(session: &Session) -> &'static str {
    if session.is_logged_in() {
        "Tab: section  j/k: move  l: like  i: comment  o: open  r: refresh  X: log out  q: quit"
    } else {
        "Tab: section  j/k: move  l: like  i: comment  o: open  r: refresh  L: log in  R: sign up  q: quit"
    }
}

fn clamp_selection(state: &mut ListState, len: usize) {
    match (state.selected(), len) {
        (_, 0) => state.select(None),
        (None, _) => state.select(Some(0)),
        (Some(index), len) if index >= len => state.select(Some(len - 1)),
        _ => {}
    }
}

fn panel_block<'a>(title: &str, focused: bool, palette: &Palette) -> Block<'a> {
    let border = if focused {
        palette.border_focused
    } else {
        palette.border_idle
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(format!(" {title} "))
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let percent_x = percent_x.min(100);
    let percent_y = percent_y.min(100);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

/// One list entry per element carrying `item_class`, each wrapped to `width`.
fn list_items(
    tree: &Node,
    item_class: &str,
    width: usize,
    palette: &Palette,
) -> Vec<ListItem<'static>> {
    tree.find_by_class(item_class)
        .into_iter()
        .map(|element| {
            let node = Node::Element(element.clone());
            let mut lines = wrap_lines(node_lines(&node, palette), width);
            lines.push(Line::default());
            ListItem::new(Text::from(lines))
        })
        .collect()
}

trait ConcatSpans {
    fn concat_spans(self) -> Vec<Span<'static>>;
}

impl ConcatSpans for Vec<Line<'static>> {
    fn concat_spans(self) -> Vec<Span<'static>> {
        self.into_iter().flat_map(|line| line.spans).collect()
    }
}

const BLOCK_TAGS: [&str; 14] = [
    "body", "header", "section", "div", "p", "h1", "h2", "h3", "a", "form", "textarea", "label",
    "li", "ul",
];

/// Terminal interpreter for render trees: block tags start new lines,
/// everything else flows inline with a class-derived style.
fn node_lines(node: &Node, palette: &Palette) -> Vec<Line<'static>> {
    let mut builder = LineBuilder::default();
    builder.walk(node, Style::default().fg(palette.text_primary), palette);
    builder.finish()
}

#[derive(Default)]
struct LineBuilder {
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
}

impl LineBuilder {
    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.lines.push(Line::from(std::mem::take(&mut self.current)));
        }
    }

    fn push(&mut self, text: String, style: Style) {
        if text.is_empty() {
            return;
        }
        if !self.current.is_empty() {
            self.current.push(Span::raw(" "));
        }
        self.current.push(Span::styled(text, style));
    }

    fn walk(&mut self, node: &Node, style: Style, palette: &Palette) {
        let element = match node {
            Node::Text(text) => {
                let mut first = true;
                for segment in text.split('\n') {
                    if !first {
                        self.flush();
                    }
                    first = false;
                    self.push(segment.to_string(), style);
                }
                return;
            }
            Node::Element(element) => element,
        };

        let style = element_style(element, style, palette);
        let block = BLOCK_TAGS.contains(&element.tag);
        if block {
            self.flush();
        }

        match element.tag {
            "img" => {
                let alt = element.get_attr("alt").unwrap_or("image");
                self.push(format!("[img: {alt}]"), style.add_modifier(Modifier::DIM));
            }
            "input" => {
                let value = match element.get_attr("data-length") {
                    Some(len) => "•".repeat(len.parse().unwrap_or(0)),
                    None => element.get_attr("value").unwrap_or_default().to_string(),
                };
                self.push(format!("{value}_"), style);
            }
            "button" => {
                let label = node.text_content();
                self.push(format!("[{label}]"), style);
            }
            _ => {
                if element.has_class("active") {
                    self.push("›".to_string(), style);
                }
                for child in &element.children {
                    self.walk(child, style, palette);
                }
            }
        }

        if block {
            self.flush();
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        self.lines
    }
}

fn element_style(element: &render::Element, inherited: Style, palette: &Palette) -> Style {
    let classes = element.get_attr("class").unwrap_or_default();
    let mut style = inherited;
    for class in classes.split_whitespace() {
        style = match class {
            "comment-author" | "video-title" | "username" => {
                style.fg(palette.accent).add_modifier(Modifier::BOLD)
            }
            "comment-time" | "video-meta" | "video-duration" | "char-count" | "comments-empty" => {
                style.fg(palette.text_secondary)
            }
            "liked" => style.fg(palette.heart).add_modifier(Modifier::BOLD),
            "comments-error" | "notification-error" => style.fg(palette.error),
            "notification-success" => style.fg(palette.success),
            "notification-info" => style.fg(palette.heart),
            "active" => style.fg(palette.accent),
            _ => style,
        };
    }
    if element.tag == "h1" || element.tag == "h2" {
        style = style.add_modifier(Modifier::BOLD);
    }
    style
}

fn wrap_lines(lines: Vec<Line<'static>>, width: usize) -> Vec<Line<'static>> {
    if width == 0 {
        return lines;
    }
    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        if line.width() <= width {
            out.push(line);
            continue;
        }
        let style = line
            .spans
            .iter()
            .max_by_key(|span| span.content.width())
            .map(|span| span.style)
            .unwrap_or_default();
        let plain: String = line.spans.iter().map(|span| span.content.as_ref()).collect();
        for piece in wrap(&plain, WrapOptions::new(width)) {
            out.push(Line::from(Span::styled(piece.into_owned(), style)));
        }
    }
    out
}
