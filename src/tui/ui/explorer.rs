//! Exploration view: patient list, score readout, age slider and the
//! attribution chart.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::application::{Insight, AGE_MAX, AGE_MIN};
use crate::domain::{RiskClass, ScoreResult, DEFAULT_THRESHOLD};
use crate::ports::PatientId;
use crate::tui::styles::MedicalTheme;

/// View state owned by the app and mutated by its key handlers.
#[derive(Debug, Default)]
pub struct ExplorerState {
    pub candidates: Vec<PatientId>,
    pub list: ListState,
    pub insight: Option<Insight>,
    /// Inline error from the last transition, cleared on success
    pub error: Option<String>,
    pub show_raw: bool,
}

impl ExplorerState {
    #[must_use]
    pub fn new(candidates: Vec<PatientId>) -> Self {
        let list = ListState::default().with_selected((!candidates.is_empty()).then_some(0));
        Self {
            candidates,
            list,
            ..Self::default()
        }
    }

    /// Patient under the list cursor.
    #[must_use]
    pub fn highlighted(&self) -> Option<PatientId> {
        self.list
            .selected()
            .and_then(|i| self.candidates.get(i).copied())
    }

    pub fn move_cursor(&mut self, delta: isize) {
        if self.candidates.is_empty() {
            return;
        }
        let last = self.candidates.len() - 1;
        let current = self.list.selected().unwrap_or(0);
        let next = current.saturating_add_signed(delta).min(last);
        self.list.select(Some(next));
    }
}

/// One bar of the attribution chart.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BarRow {
    pub label: String,
    pub contribution: f64,
    /// Bar length in terminal cells
    pub cells: usize,
}

/// Scale the top contributions to at most `width` cells, largest first.
pub(crate) fn attribution_bars(insight: &Insight, width: usize) -> Vec<BarRow> {
    let top = insight.top_contributions();
    let max_abs = top.first().map_or(0.0, |c| c.contribution.abs());

    top.into_iter()
        .map(|c| {
            let cells = if max_abs > 0.0 {
                ((c.contribution.abs() / max_abs) * width as f64).round() as usize
            } else {
                0
            };
            BarRow {
                label: format!("{} = {}", c.name, c.value),
                contribution: c.contribution,
                cells: cells.min(width),
            }
        })
        .collect()
}

/// Render the exploration screen
pub fn render_explorer(f: &mut Frame, area: Rect, state: &mut ExplorerState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Footer
        ])
        .split(area);

    render_header(f, chunks[0], state);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(24), Constraint::Min(0)])
        .split(chunks[1]);

    render_patient_list(f, body[0], state);
    render_detail(f, body[1], state);
    render_footer(f, chunks[2]);
}

fn render_header(f: &mut Frame, area: Rect, state: &ExplorerState) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", MedicalTheme::text()),
        Span::styled("Readmission Explorer", MedicalTheme::title()),
        Span::styled(
            format!(" │ {} sampled patients", state.candidates.len()),
            MedicalTheme::text_secondary(),
        ),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(header, area);
}

fn render_patient_list(f: &mut Frame, area: Rect, state: &mut ExplorerState) {
    let active = state.insight.as_ref().map(|i| i.patient_id);
    let items: Vec<ListItem> = state
        .candidates
        .iter()
        .map(|id| {
            let marker = if Some(*id) == active { "● " } else { "  " };
            ListItem::new(Line::from(vec![
                Span::styled(marker, MedicalTheme::subtitle()),
                Span::styled(id.to_string(), MedicalTheme::text()),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .title(Span::styled(" Patients ", MedicalTheme::subtitle()))
                .borders(Borders::ALL)
                .border_style(MedicalTheme::border_focused()),
        )
        .highlight_style(MedicalTheme::selected());

    f.render_stateful_widget(list, area, &mut state.list);
}

fn render_detail(f: &mut Frame, area: Rect, state: &ExplorerState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Probability readout
            Constraint::Length(3), // Age slider
            Constraint::Length(1), // Inline error
            Constraint::Min(0),    // Chart (and raw features)
        ])
        .split(area);

    render_error(f, chunks[2], state);

    let Some(insight) = &state.insight else {
        let idle = Paragraph::new(Line::from(Span::styled(
            "Select a patient with Enter",
            MedicalTheme::text_muted(),
        )))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(MedicalTheme::border()),
        );
        f.render_widget(idle, chunks[3]);
        return;
    };

    render_readout(f, chunks[0], insight);
    render_age_slider(f, chunks[1], insight.age);

    if state.show_raw {
        let split = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[3]);
        render_chart(f, split[0], insight);
        render_raw_features(f, split[1], insight);
    } else {
        render_chart(f, chunks[3], insight);
    }
}

fn render_error(f: &mut Frame, area: Rect, state: &ExplorerState) {
    if let Some(message) = &state.error {
        let error = Paragraph::new(Line::from(Span::styled(
            format!(" {message}"),
            MedicalTheme::warning(),
        )));
        f.render_widget(error, area);
    }
}

/// Readout colour class. Fixed at 0.5 regardless of the configured
/// classification threshold.
fn readout_class(score: &ScoreResult) -> RiskClass {
    RiskClass::from_probability(score.probability, DEFAULT_THRESHOLD)
}

fn render_readout(f: &mut Frame, area: Rect, insight: &Insight) {
    let score = &insight.score;
    let style = MedicalTheme::risk_class(readout_class(score));

    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(Span::styled(
                    format!(
                        " Patient {} │ {} │ {:.2}s ",
                        insight.patient_id, score.classification, score.runtime
                    ),
                    style.add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(MedicalTheme::border()),
        )
        .gauge_style(style)
        .ratio(score.probability.clamp(0.0, 1.0))
        .label(format!("Readmission probability {:.2}%", score.percent()));

    f.render_widget(gauge, area);
}

fn render_age_slider(f: &mut Frame, area: Rect, age: i64) {
    let ratio = (age - AGE_MIN) as f64 / (AGE_MAX - AGE_MIN) as f64;
    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(Span::styled(
                    format!(" Age [{AGE_MIN}-{AGE_MAX}] "),
                    MedicalTheme::text_secondary(),
                ))
                .borders(Borders::ALL)
                .border_style(MedicalTheme::border()),
        )
        .gauge_style(MedicalTheme::info())
        .ratio(ratio.clamp(0.0, 1.0))
        .label(format!("{age}"));

    f.render_widget(gauge, area);
}

fn render_chart(f: &mut Frame, area: Rect, insight: &Insight) {
    let block = Block::default()
        .title(Span::styled(
            " Top feature contributions (log-odds) ",
            MedicalTheme::subtitle(),
        ))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let label_width = 30usize;
    let value_width = 9usize;
    let bar_width = (inner.width as usize).saturating_sub(label_width + value_width + 2);

    let mut lines: Vec<Line> = attribution_bars(insight, bar_width)
        .into_iter()
        .map(|row| {
            let mut label = row.label;
            if label.chars().count() > label_width {
                label = label.chars().take(label_width - 1).collect::<String>() + "…";
            }
            Line::from(vec![
                Span::styled(
                    format!("{label:<label_width$} "),
                    MedicalTheme::text_secondary(),
                ),
                Span::styled(
                    "█".repeat(row.cells),
                    MedicalTheme::contribution(row.contribution),
                ),
                Span::styled(
                    format!(" {:+.3}", row.contribution),
                    MedicalTheme::text(),
                ),
            ])
        })
        .collect();

    let shown = insight.top_contributions().len();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!(
            "base {:+.3} │ other features {:+.3} │ log-odds {:+.3}",
            insight.attribution.base_value,
            insight.attribution.remainder(shown),
            insight.attribution.output()
        ),
        MedicalTheme::text_muted(),
    )));

    f.render_widget(Paragraph::new(lines), inner);
}

fn render_raw_features(f: &mut Frame, area: Rect, insight: &Insight) {
    let lines: Vec<Line> = insight
        .features
        .iter()
        .map(|(name, value)| {
            Line::from(vec![
                Span::styled(format!("{name}: "), MedicalTheme::text_secondary()),
                Span::styled(value.to_string(), MedicalTheme::text()),
            ])
        })
        .collect();

    let raw = Paragraph::new(lines).block(
        Block::default()
            .title(Span::styled(" Raw features ", MedicalTheme::subtitle()))
            .borders(Borders::ALL)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(raw, area);
}

fn render_footer(f: &mut Frame, area: Rect) {
    let hints = [
        ("↑/↓", "Browse"),
        ("Enter", "Select"),
        ("←/→", "Age ±1"),
        ("PgUp/PgDn", "Age ±5"),
        ("r", "Raw features"),
        ("q", "Quit"),
    ];

    let spans: Vec<Span> = hints
        .iter()
        .flat_map(|(key, desc)| {
            [
                Span::styled(format!(" {key} "), MedicalTheme::key_hint()),
                Span::styled(format!("{desc}  "), MedicalTheme::key_desc()),
            ]
        })
        .collect();

    let footer = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(footer, area);
}
