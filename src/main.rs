//! Terminal 2048 runner (default binary).
//!
//! crossterm for input, the framebuffer renderer from `tui_2048::term` for
//! output, and the optional TCP adapter for remote control.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event};

use tui_2048::adapter::protocol::create_ack;
use tui_2048::adapter::{build_observation, Adapter, InboundCommand, InboundPayload, OutboundMessage};
use tui_2048::core::{dispatch, GameConfig, Session, SessionSnapshot};
use tui_2048::input::{handle_key_event, should_quit, SwipeTracker};
use tui_2048::term::{
    AdapterStatusView, FrameBuffer, GameView, TerminalRenderer, TileEffects, Viewport,
};
use tui_2048::types::{GameAction, GameEvent, TICK_MS};

fn main() -> Result<()> {
    init_logging()?;

    let session = Session::new(GameConfig::from_env()).context("invalid game configuration")?;
    log::info!(
        "starting {}x{} game, seed {}",
        session.config().rows,
        session.config().cols,
        session.seed()
    );

    let adapter = match Adapter::start_from_env() {
        Ok(adapter) => adapter,
        Err(e) => {
            log::warn!("[Adapter] not started: {:#}", e);
            None
        }
    };

    let mut term = TerminalRenderer::new().with_mouse_capture();
    term.enter()?;

    let mut app = App::new(session, adapter);
    let result = app.run(&mut term);

    // Always try to restore terminal state.
    let _ = term.exit();
    result
}

/// Log to `TUI_2048_LOG_PATH` when set; the terminal belongs to the game.
fn init_logging() -> Result<()> {
    let Some(path) = std::env::var("TUI_2048_LOG_PATH")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
    else {
        return Ok(());
    };

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("cannot open log file {}", path))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

struct App {
    session: Session,
    adapter: Option<Adapter>,
    effects: TileEffects,
    swipe: SwipeTracker,
    view: GameView,
    snap: SessionSnapshot,
    fb: FrameBuffer,
    /// Events drained from the session, not yet published
    events: Vec<GameEvent>,
    obs_seq: u64,
}

impl App {
    fn new(session: Session, adapter: Option<Adapter>) -> Self {
        Self {
            session,
            adapter,
            effects: TileEffects::new(),
            swipe: SwipeTracker::default(),
            view: GameView::default(),
            snap: SessionSnapshot::default(),
            fb: FrameBuffer::new(0, 0),
            events: Vec::with_capacity(64),
            obs_seq: 0,
        }
    }

    fn run(&mut self, term: &mut TerminalRenderer) -> Result<()> {
        self.session.advance()?;
        self.publish();

        let tick_duration = Duration::from_millis(TICK_MS as u64);
        let mut last_tick = Instant::now();

        loop {
            self.render(term)?;

            // Input with timeout until next tick.
            let timeout = tick_duration.saturating_sub(last_tick.elapsed());
            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) => {
                        if should_quit(key) {
                            return Ok(());
                        }
                        if let Some(action) = handle_key_event(key) {
                            self.play(action)?;
                        }
                    }
                    Event::Mouse(mouse) => {
                        if let Some(direction) = self.swipe.handle_mouse_event(mouse) {
                            self.play(GameAction::Move(direction))?;
                        }
                    }
                    Event::Resize(_, _) => term.invalidate(),
                    Event::FocusLost => self.swipe.cancel(),
                    _ => {}
                }
            }

            self.poll_adapter()?;

            // Tick.
            let elapsed = last_tick.elapsed();
            if elapsed >= tick_duration {
                last_tick = Instant::now();
                self.effects.tick(elapsed.as_millis() as u32);
            }
        }
    }

    /// Apply one input and resolve the turn it starts
    fn play(&mut self, action: GameAction) -> Result<()> {
        if self.session.play(action)? {
            self.publish();
        }
        Ok(())
    }

    fn poll_adapter(&mut self) -> Result<()> {
        while let Some(InboundCommand {
            client_id,
            seq,
            payload,
        }) = self.adapter.as_mut().and_then(Adapter::try_recv)
        {
            match payload {
                InboundPayload::Actions(actions) => {
                    for action in actions {
                        self.session.play(action)?;
                    }
                    self.send(OutboundMessage::ToClientAck {
                        client_id,
                        ack: create_ack(seq),
                    });
                    self.publish();
                }
                InboundPayload::SnapshotRequest => {
                    self.session.snapshot_into(&mut self.snap);
                    let obs = build_observation(self.next_obs_seq(), &self.snap, &[]);
                    self.send(OutboundMessage::ToClientObservation {
                        client_id,
                        obs: Box::new(obs),
                    });
                }
            }
        }
        Ok(())
    }

    /// Hand pending session events to the effects layer and to streaming
    /// clients.
    fn publish(&mut self) {
        self.events.extend(self.session.drain_events());
        if self.events.is_empty() {
            return;
        }

        for event in &self.events {
            dispatch(event, &mut self.effects);
        }

        if self
            .adapter
            .as_ref()
            .is_some_and(Adapter::has_streaming_clients)
        {
            self.session.snapshot_into(&mut self.snap);
            let obs = build_observation(self.next_obs_seq(), &self.snap, &self.events);
            self.send(OutboundMessage::BroadcastObservation { obs: Box::new(obs) });
        }

        self.events.clear();
    }

    fn send(&self, msg: OutboundMessage) {
        if let Some(adapter) = self.adapter.as_ref() {
            adapter.send(msg);
        }
    }

    fn next_obs_seq(&mut self) -> u64 {
        self.obs_seq += 1;
        self.obs_seq
    }

    fn render(&mut self, term: &mut TerminalRenderer) -> Result<()> {
        let (w, h) = crossterm::terminal::size().unwrap_or((80, 24));
        self.session.snapshot_into(&mut self.snap);

        let status = self.adapter.as_ref().map(|a| {
            let s = a.status();
            AdapterStatusView {
                client_count: s.client_count,
                controller_id: s.controller_id,
                streaming_count: s.streaming_count,
            }
        });

        self.view.render_into_with(
            &self.snap,
            Some(&self.effects),
            status.as_ref(),
            Viewport::new(w, h),
            &mut self.fb,
        );
        term.draw_swap(&mut self.fb)
    }
}
