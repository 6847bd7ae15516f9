use std::io::{self, Stdout};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use clap::Parser;
use crossterm::{
    cursor,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    Terminal,
    backend::{Backend, CrosstermBackend, TestBackend},
};

use term_gloss::app::GlossApp;
use term_gloss::settings::Settings;
use term_gloss::translate::{MockRequester, StreamingTranslator};

const WORDS: [&str; 16] = [
    "stream", "buffer", "anchor", "overlay", "viewport", "pointer", "render", "frame", "gloss",
    "select", "token", "reply", "header", "resize", "scroll", "layout",
];

#[derive(Parser, Debug)]
#[command(
    name = "gloss-bench",
    version = env!("CARGO_PKG_VERSION"),
    about = "Streams mock translations into the tooltip and measures render throughput"
)]
struct BenchCli {
    /// How long to run the benchmark.
    #[arg(
        short = 'd',
        long = "duration",
        value_name = "SECONDS",
        default_value_t = 10.0
    )]
    duration_seconds: f64,

    /// Target frames per second. Used to pace rendering so comparisons are repeatable.
    #[arg(short = 'f', long = "fps", value_name = "FPS", default_value_t = 60.0)]
    target_fps: f64,

    /// Delay between streamed words, in milliseconds.
    #[arg(long = "word-delay", value_name = "MS", default_value_t = 2)]
    word_delay_ms: u64,

    /// Lines in the generated document.
    #[arg(long, default_value_t = 400)]
    lines: usize,

    /// Render into an in-memory backend of this size (`COLSxROWS`) instead of
    /// the terminal.
    #[arg(long, value_name = "COLSxROWS")]
    headless: Option<String>,
}

impl BenchCli {
    fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_seconds)
    }

    fn frame_budget(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_fps)
    }
}

struct BenchConfig {
    duration: Duration,
    target_fps: f64,
    frame_budget: Duration,
    word_delay: Duration,
    lines: usize,
    headless: Option<(u16, u16)>,
}

impl TryFrom<&BenchCli> for BenchConfig {
    type Error = String;

    fn try_from(cli: &BenchCli) -> Result<Self, Self::Error> {
        if !(0.5..=600.0).contains(&cli.duration_seconds) {
            return Err("duration must be between 0.5 and 600 seconds".to_string());
        }
        if !(1.0..=240.0).contains(&cli.target_fps) {
            return Err("fps must be between 1 and 240".to_string());
        }
        if cli.lines == 0 {
            return Err("the document needs at least one line".to_string());
        }
        let headless = cli.headless.as_deref().map(parse_size).transpose()?;
        Ok(Self {
            duration: cli.duration(),
            target_fps: cli.target_fps,
            frame_budget: cli.frame_budget(),
            word_delay: Duration::from_millis(cli.word_delay_ms),
            lines: cli.lines,
            headless,
        })
    }
}

fn parse_size(raw: &str) -> Result<(u16, u16), String> {
    let (cols, rows) = raw
        .split_once('x')
        .ok_or_else(|| format!("expected COLSxROWS, got `{raw}`"))?;
    let cols: u16 = cols.parse().map_err(|_| format!("bad column count `{cols}`"))?;
    let rows: u16 = rows.parse().map_err(|_| format!("bad row count `{rows}`"))?;
    if cols < 20 || rows < 6 {
        return Err("headless size must be at least 20x6".to_string());
    }
    Ok((cols, rows))
}

fn main() -> io::Result<()> {
    let args = BenchCli::parse();
    let config = BenchConfig::try_from(&args)
        .map_err(|msg| io::Error::new(io::ErrorKind::InvalidInput, msg))?;

    let document = WordSource::seeded_from_clock().document(config.lines, 10);
    let settings = Settings::default();
    let translator = StreamingTranslator::new(
        MockRequester::new().with_word_delay(config.word_delay),
        &settings,
    );
    let mut app = GlossApp::new(&document, "bench", Box::new(translator), &settings)
        .map_err(io::Error::other)?;

    let stats = match config.headless {
        Some((cols, rows)) => {
            let mut terminal = Terminal::new(TestBackend::new(cols, rows))
                .map_err(|err| io::Error::other(err.to_string()))?;
            run_benchmark(&mut terminal, &mut app, &config, |_| Ok(false))?
        }
        None => run_in_terminal(&mut app, &config)?,
    };
    println!("{}", stats.final_report(&config));

    Ok(())
}

fn run_in_terminal(app: &mut GlossApp, config: &BenchConfig) -> io::Result<BenchStats> {
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        cursor::Hide
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal: Terminal<CrosstermBackend<Stdout>> = Terminal::new(backend)?;
    terminal.hide_cursor()?;

    let bench_result = run_benchmark(&mut terminal, app, config, poll_for_exit);

    terminal.show_cursor()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        cursor::Show
    )?;
    terminal::disable_raw_mode()?;

    bench_result
}

fn run_benchmark<B, F>(
    terminal: &mut Terminal<B>,
    app: &mut GlossApp,
    config: &BenchConfig,
    mut poll_exit: F,
) -> io::Result<BenchStats>
where
    B: Backend,
    F: FnMut(Duration) -> io::Result<bool>,
{
    let mut stats = BenchStats::new();
    let mut tick: u64 = 0;
    let mut exit_reason = ExitReason::Completed;

    loop {
        let frame_start = Instant::now();
        if app.controller().translator().in_flight() == 0 {
            stats.record_selection(select_next_line(app, tick));
        }
        let chunks = app.tick();
        terminal
            .draw(|frame| app.render(frame))
            .map_err(|err| io::Error::other(err.to_string()))?;
        let draw_time = frame_start.elapsed();
        stats.record_frame(chunks, draw_time);

        if stats.elapsed() >= config.duration {
            break;
        }

        if poll_exit(config.frame_budget.saturating_sub(draw_time))? {
            exit_reason = ExitReason::UserAbort;
            break;
        }

        tick = tick.wrapping_add(1);
    }

    stats.exit_reason = exit_reason;
    stats.mark_completed();
    Ok(stats)
}

/// Ctrl-drag across one pager row, the way a user opens the tooltip.
fn select_next_line(app: &mut GlossApp, tick: u64) -> bool {
    let area = app.pager().area();
    if area.width < 2 || area.height == 0 {
        return false;
    }
    let row = area.y + ((tick.wrapping_mul(7)) % area.height as u64) as u16;
    let last = area.right() - 1;
    let ctrl = KeyModifiers::CONTROL;
    let mouse = |kind, column| {
        Event::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: ctrl,
        })
    };
    app.handle_event(&mouse(MouseEventKind::Down(MouseButton::Left), area.x));
    app.handle_event(&mouse(MouseEventKind::Drag(MouseButton::Left), last));
    app.handle_event(&mouse(MouseEventKind::Up(MouseButton::Left), last));
    app.controller().translator().in_flight() > 0
}

struct BenchStats {
    start: Instant,
    completed_at: Option<Instant>,
    frame_count: u64,
    chunks_applied: u64,
    translations: u64,
    skipped_selections: u64,
    total_draw_time: Duration,
    fastest_frame: Duration,
    slowest_frame: Duration,
    exit_reason: ExitReason,
}

impl BenchStats {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            completed_at: None,
            frame_count: 0,
            chunks_applied: 0,
            translations: 0,
            skipped_selections: 0,
            total_draw_time: Duration::ZERO,
            fastest_frame: Duration::MAX,
            slowest_frame: Duration::ZERO,
            exit_reason: ExitReason::Completed,
        }
    }

    fn elapsed(&self) -> Duration {
        match self.completed_at {
            Some(done) => done.duration_since(self.start),
            None => self.start.elapsed(),
        }
    }

    fn mark_completed(&mut self) {
        self.completed_at = Some(Instant::now());
    }

    fn record_selection(&mut self, opened: bool) {
        if opened {
            self.translations = self.translations.saturating_add(1);
        } else {
            self.skipped_selections = self.skipped_selections.saturating_add(1);
        }
    }

    fn record_frame(&mut self, chunks: usize, draw_time: Duration) {
        self.frame_count = self.frame_count.saturating_add(1);
        self.chunks_applied = self.chunks_applied.saturating_add(chunks as u64);
        self.total_draw_time += draw_time;
        if draw_time < self.fastest_frame {
            self.fastest_frame = draw_time;
        }
        if draw_time > self.slowest_frame {
            self.slowest_frame = draw_time;
        }
    }

    fn average_frame_ms(&self) -> f64 {
        if self.frame_count == 0 {
            return 0.0;
        }
        (self.total_draw_time.as_secs_f64() / self.frame_count as f64) * 1_000.0
    }

    fn fastest_frame_ms(&self) -> f64 {
        if self.frame_count == 0 {
            return 0.0;
        }
        self.fastest_frame.as_secs_f64() * 1_000.0
    }

    fn slowest_frame_ms(&self) -> f64 {
        if self.frame_count == 0 {
            return 0.0;
        }
        self.slowest_frame.as_secs_f64() * 1_000.0
    }

    fn final_report(&self, config: &BenchConfig) -> String {
        let elapsed = self.elapsed().as_secs_f64();
        let per_second = |count: u64| {
            if elapsed > 0.0 {
                count as f64 / elapsed
            } else {
                0.0
            }
        };

        indoc::formatdoc!(
            r#"
            Gloss bench {status}.
            Duration: {elapsed:.2}s (target {target:.2}s)
            Frames: {frames} | Avg FPS: {fps:.1} (target {target_fps:.1})
            Avg frame: {avg:.2} ms | Best: {best:.2} ms | Worst: {worst:.2} ms
            Stream chunks: {chunks} total (~{chunks_per_sec:.0}/s)
            Translations: {translations} opened | {skipped} selections skipped
            "#,
            status = self.exit_reason.describe(),
            elapsed = elapsed,
            target = config.duration.as_secs_f64(),
            frames = self.frame_count,
            fps = per_second(self.frame_count),
            target_fps = config.target_fps,
            avg = self.average_frame_ms(),
            best = self.fastest_frame_ms(),
            worst = self.slowest_frame_ms(),
            chunks = self.chunks_applied,
            chunks_per_sec = per_second(self.chunks_applied),
            translations = self.translations,
            skipped = self.skipped_selections,
        )
    }
}

#[derive(Copy, Clone)]
enum ExitReason {
    Completed,
    UserAbort,
}

impl ExitReason {
    fn describe(self) -> &'static str {
        match self {
            ExitReason::Completed => "completed full duration",
            ExitReason::UserAbort => "stopped by user",
        }
    }
}

/// Cheap LCG for generating filler text.
struct WordSource {
    state: u64,
}

impl WordSource {
    fn seeded_from_clock() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
            ^ 0xA5A5_A5A5_1234_5678;
        Self { state: seed }
    }

    fn next(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.state >> 32) as u32
    }

    fn document(&mut self, lines: usize, words_per_line: usize) -> String {
        let mut out = String::new();
        for _ in 0..lines {
            let line: Vec<&str> = (0..words_per_line)
                .map(|_| WORDS[self.next() as usize % WORDS.len()])
                .collect();
            out.push_str(&line.join(" "));
            out.push('\n');
        }
        out
    }
}

fn poll_for_exit(wait: Duration) -> io::Result<bool> {
    if !event::poll(wait)? {
        return Ok(false);
    }
    loop {
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if matches!(
                    key.code,
                    KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc
                ) {
                    return Ok(true);
                }
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(true);
                }
            }
            _ => {}
        }
        if !event::poll(Duration::ZERO)? {
            break;
        }
    }
    Ok(false)
}
