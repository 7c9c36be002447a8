//! TUI for osci
//!
//! A small control surface: the parameter list, live frequency readout and a
//! virtual MIDI knob that goes through the same learn/drive path as hardware.

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    DefaultTerminal, Frame,
};
use std::time::Duration;

use osci_dsp::{
    control::{Parameter, ParameterTarget},
    io::MidiEvent,
    Pipeline, Result,
};

/// Controller number of the on-screen knob.
const VIRTUAL_CC: u8 = 21;
/// Knob movement per key press.
const KNOB_STEP: u8 = 4;
/// Left/right adjustment as a fraction of the parameter range.
const NUDGE: f32 = 0.02;

pub struct UiApp {
    pipeline: Pipeline,
    selected: usize,
    knob: u8,
    status: String,
    should_quit: bool,
}

impl UiApp {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            selected: 0,
            knob: 64,
            status: String::from("ready"),
            should_quit: false,
        }
    }

    pub fn into_pipeline(self) -> Pipeline {
        self.pipeline
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            terminal.draw(|frame| self.render(frame))?;

            // Non-blocking, ~30fps is plenty for a readout
            if event::poll(Duration::from_millis(33))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        if let Err(err) = self.handle_key(key.code) {
                            self.status = err.to_string();
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn selected_target(&self) -> Option<ParameterTarget> {
        self.pipeline.parameters().at(self.selected).map(|p| p.target)
    }

    fn handle_key(&mut self, key: KeyCode) -> Result<()> {
        let count = self.pipeline.parameters().len();
        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => self.selected = (self.selected + 1).min(count.saturating_sub(1)),
            KeyCode::Left | KeyCode::Right => {
                let direction = if key == KeyCode::Left { -1.0 } else { 1.0 };
                if let Some(parameter) = self.pipeline.parameters().at(self.selected) {
                    let mut next = parameter.clone();
                    let value = next.nudge(direction * NUDGE);
                    self.pipeline.set_parameter(next.target, value)?;
                }
            }
            KeyCode::Char(digit @ '1'..='9') => {
                let index = digit as usize - '1' as usize;
                if index < self.pipeline.sources().len() {
                    self.pipeline.select_source(index)?;
                    self.status = format!("source {}", index + 1);
                }
            }
            KeyCode::Char('m') => {
                if let Some(target) = self.selected_target() {
                    self.pipeline.arm(target);
                    self.status = format!("{} armed: turn the knob", target.label());
                }
            }
            KeyCode::Char(',') => self.turn_knob(self.knob.saturating_sub(KNOB_STEP))?,
            KeyCode::Char('.') => self.turn_knob((self.knob + KNOB_STEP).min(127))?,
            KeyCode::Char('e') => {
                if let Some(ParameterTarget::Effect(id)) = self.selected_target() {
                    let enabled = !self.pipeline.is_effect_enabled(id);
                    self.pipeline.set_effect_enabled(id, enabled)?;
                }
            }
            KeyCode::Char('r') => {
                self.pipeline.restart_effects()?;
                self.status = String::from("effects restarted");
            }
            _ => {}
        }
        Ok(())
    }

    fn turn_knob(&mut self, value: u8) -> Result<()> {
        self.knob = value;
        let action = self.pipeline.handle_midi(MidiEvent::ControlChange {
            channel: 0,
            controller: VIRTUAL_CC,
            value,
        })?;
        if let Some(action) = action {
            self.status = format!("{action:?}");
        }
        Ok(())
    }

    fn render(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4), // Status
                Constraint::Min(6),    // Parameters
                Constraint::Length(1), // Help bar
            ])
            .split(frame.area());

        self.render_status(frame, chunks[0]);
        self.render_parameters(frame, chunks[1]);

        let help = Paragraph::new(
            " [↑↓] Select  [←→] Adjust  [1-9] Source  [M] Learn  [,.] Knob  [E] Effect on/off  [R] Restart  [Q] Quit",
        )
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[2]);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let device = self
            .pipeline
            .device()
            .map(ToString::to_string)
            .unwrap_or_else(|| String::from("no device"));
        let source = self
            .pipeline
            .sources()
            .get(self.pipeline.active_source())
            .and_then(|s| s.lock().ok().map(|s| s.name().to_owned()))
            .unwrap_or_default();
        let frequency = self.pipeline.frequency();

        let lines = vec![
            Line::from(format!(
                " {device}  |  source {}: {source}  |  underruns {}",
                self.pipeline.active_source() + 1,
                self.pipeline.underruns()
            )),
            Line::from(format!(
                " L {:>8.1} Hz   R {:>8.1} Hz   knob {:>3}   {}",
                frequency.left, frequency.right, self.knob, self.status
            )),
        ];
        let block = Block::default().title(" osci ").borders(Borders::ALL);
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_parameters(&self, frame: &mut Frame, area: Rect) {
        let mapper = self.pipeline.cc_mapper();
        let lines: Vec<Line> = self
            .pipeline
            .parameters()
            .iter()
            .enumerate()
            .map(|(i, parameter)| {
                let cc = mapper
                    .cc_for(parameter.target)
                    .map(|cc| format!("CC{cc}"))
                    .unwrap_or_default();
                let armed = mapper.armed() == Some(parameter.target);
                let mut style = Style::default();
                if i == self.selected {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                Line::from(vec![
                    Span::styled(format!(" {:<18}", parameter.label()), style),
                    Span::raw(format!(" {:>7.3} ", parameter.value())),
                    Span::styled(meter(parameter), Style::default().fg(Color::Cyan)),
                    Span::raw(format!(" {:<6}", cc)),
                    Span::styled(self.flag(parameter, armed), Style::default().fg(Color::Yellow)),
                ])
            })
            .collect();

        let block = Block::default().title(" Parameters ").borders(Borders::ALL);
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn flag(&self, parameter: &Parameter, armed: bool) -> &'static str {
        if armed {
            return "learning";
        }
        match parameter.target {
            ParameterTarget::Effect(id) if self.pipeline.is_effect_enabled(id) => "on",
            ParameterTarget::Effect(_) => "off",
            _ => "",
        }
    }
}

fn meter(parameter: &Parameter) -> String {
    const WIDTH: usize = 20;
    let filled = (parameter.normalised() * WIDTH as f32).round() as usize;
    format!("{}{}", "█".repeat(filled.min(WIDTH)), "░".repeat(WIDTH - filled.min(WIDTH)))
}
