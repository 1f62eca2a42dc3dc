use crate::settings::Settings;
use crate::sprites::{art, EYE_ROW, UNITS_PER_COL, UNITS_PER_ROW};
use crossterm::{
    cursor,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::cmp::{max, min};
use std::io::{self, Write};
use tomodashi::{DeathOverlay, Point, Size, Stage, VisualPose};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
        }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }
    pub(crate) fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }
    pub(crate) fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }
    pub(crate) fn set_i32(&mut self, x: i32, y: i32, c: Cell) {
        if x >= 0 && y >= 0 {
            self.set(x as u16, y as u16, c);
        }
    }
    #[cfg(test)]
    pub(crate) fn get(&self, x: u16, y: u16) -> Option<Cell> {
        (x < self.w && y < self.h).then(|| self.cells[self.idx(x, y)])
    }
    pub(crate) fn clear(&mut self, bg: Color) {
        for c in &mut self.cells {
            c.ch = ' ';
            c.fg = Color::White;
            c.bg = bg;
        }
    }
}

pub(crate) struct Terminal {
    pub(crate) out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    pub(crate) prev: CellBuffer,
    pub(crate) cur: CellBuffer,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide,
            DisableLineWrap,
            terminal::Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        Ok(Self {
            out,
            cols,
            rows,
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            DisableMouseCapture,
            EndSynchronizedUpdate,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let (c, r) = terminal::size()?;
        if c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        Ok(true)
    }

    pub(crate) fn present(&mut self, diff_only: bool) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if diff_only && c == self.prev.cells[i] {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;

                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }

                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

/* -----------------------------
   Pet viewport <-> container units
------------------------------ */

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Viewport {
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) w: i32,
    pub(crate) h: i32,
}

impl Viewport {
    /// Left panel for text, pet on the right, status line at the bottom.
    pub(crate) fn for_terminal(cols: u16, rows: u16) -> Self {
        let cols = cols as i32;
        let rows = rows as i32;
        let panel_w = min(max(26, cols / 3), max(cols - 10, 0));
        Self {
            x: panel_w,
            y: 0,
            w: max(cols - panel_w, 0),
            h: max(rows - 1, 0),
        }
    }

    pub(crate) fn container(&self) -> Size {
        Size::new(
            self.w as f32 * UNITS_PER_COL,
            self.h as f32 * UNITS_PER_ROW,
        )
    }

    fn centre(&self) -> (f32, f32) {
        (
            self.x as f32 + self.w as f32 / 2.0,
            self.y as f32 + self.h as f32 / 2.0,
        )
    }

    /// Cell under a container point (y up, origin at the viewport centre).
    pub(crate) fn to_cell(&self, p: Point) -> (i32, i32) {
        let (cx, cy) = self.centre();
        (
            (cx + p.x / UNITS_PER_COL).floor() as i32,
            (cy - p.y / UNITS_PER_ROW).floor() as i32,
        )
    }

    /// Container point at the centre of a terminal cell.
    pub(crate) fn to_point(&self, col: u16, row: u16) -> Point {
        let (cx, cy) = self.centre();
        Point::new(
            (col as f32 + 0.5 - cx) * UNITS_PER_COL,
            (cy - row as f32 - 0.5) * UNITS_PER_ROW,
        )
    }
}

fn stage_color(stage: Stage, enable_color: bool) -> Color {
    if !enable_color {
        return Color::White;
    }
    match stage {
        Stage::Baby => Color::Rgb {
            r: 255,
            g: 200,
            b: 220,
        },
        Stage::Child => Color::Rgb {
            r: 150,
            g: 220,
            b: 255,
        },
        Stage::Teen => Color::Rgb {
            r: 140,
            g: 240,
            b: 200,
        },
        Stage::Adult => Color::Rgb {
            r: 240,
            g: 220,
            b: 140,
        },
        Stage::Senior => Color::Rgb {
            r: 200,
            g: 200,
            b: 200,
        },
    }
}

/// Draws `lines` centred on `(cx, row0 + i)`, shearing rows by `rotation` to suggest a lean.
fn blit(buf: &mut CellBuffer, lines: &[&str], cx: i32, row0: i32, rotation: f32, fg: Color) {
    let n = lines.len() as i32;
    for (i, line) in lines.iter().enumerate() {
        let height_units = (n - i as i32) as f32 * UNITS_PER_ROW;
        let shear = (rotation.sin() * height_units / UNITS_PER_COL).round() as i32;
        let w = line.chars().count() as i32;
        let x0 = cx - w / 2 + shear;
        for (dx, ch) in line.chars().enumerate() {
            if ch == ' ' {
                continue;
            }
            buf.set_i32(
                x0 + dx as i32,
                row0 + i as i32,
                Cell {
                    ch,
                    fg,
                    bg: Color::Black,
                },
            );
        }
    }
}

pub(crate) fn draw_pet(
    buf: &mut CellBuffer,
    vp: Viewport,
    stage: Stage,
    pose: VisualPose,
    overlay: Option<DeathOverlay>,
    settings: &Settings,
) {
    let (Some(pos), Some(texture)) = (pose.position, pose.texture) else {
        return;
    };
    let lines = art(texture);
    let (cx, cy) = vp.to_cell(pos);
    let row0 = cy - lines.len() as i32 / 2;
    let fg = if overlay.is_some() {
        Color::DarkGrey
    } else {
        stage_color(stage, settings.enable_color)
    };
    blit(buf, lines, cx, row0, pose.rotation, fg);

    if let Some(DeathOverlay {
        texture: Some(eyes),
    }) = overlay
    {
        let red = if settings.enable_color {
            Color::Red
        } else {
            Color::White
        };
        let shear_rows = lines.len().saturating_sub(EYE_ROW);
        let height_units = shear_rows as f32 * UNITS_PER_ROW;
        let shear = (pose.rotation.sin() * height_units / UNITS_PER_COL).round() as i32;
        blit(buf, art(eyes), cx + shear, row0 + EYE_ROW as i32, 0.0, red);
    }
}

pub(crate) fn draw_ground(buf: &mut CellBuffer, vp: Viewport) {
    let y = vp.y + vp.h - 1;
    for x in vp.x..vp.x + vp.w {
        buf.set_i32(
            x,
            y,
            Cell {
                ch: '▁',
                fg: Color::DarkGreen,
                bg: Color::Black,
            },
        );
    }
}

/* -----------------------------
   UI panel (text)
------------------------------ */

pub(crate) fn draw_text(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color, bg: Color) {
    for (i, ch) in s.chars().enumerate() {
        let xx = x.saturating_add(i as u16);
        if xx >= buf.w || y >= buf.h {
            break;
        }
        buf.set(xx, y, Cell { ch, fg, bg });
    }
}

fn bar(value01: f32, width: usize) -> String {
    let v = value01.clamp(0.0, 1.0);
    let fill = (v * width as f32 + 0.5) as usize;
    let mut s = String::new();
    s.push('[');
    for i in 0..width {
        s.push(if i < fill { '█' } else { ' ' });
    }
    s.push(']');
    s
}

pub(crate) struct PanelInfo<'a> {
    pub(crate) name: &'a str,
    pub(crate) stage: Stage,
    pub(crate) age: f64,
    pub(crate) death_age: f64,
    pub(crate) dead: bool,
    pub(crate) tilt: f32,
    pub(crate) message: &'a str,
}

pub(crate) fn ui_panel(buf: &mut CellBuffer, info: &PanelInfo<'_>) {
    let bg = Color::Black;
    let fg = Color::White;

    draw_text(buf, 1, 0, &format!("Tomodashi  |  {}", info.name), fg, bg);

    let state = if info.dead { "passed on" } else { "alive" };
    draw_text(buf, 1, 2, &format!("Stage: {}", info.stage), fg, bg);
    draw_text(buf, 1, 3, &format!("State: {state}"), fg, bg);
    draw_text(buf, 1, 4, &format!("Age:   {:.2} days", info.age), fg, bg);

    let life = bar((info.age / info.death_age) as f32, 14);
    draw_text(buf, 1, 6, &format!("Life {life}"), fg, bg);

    let tilt = bar((info.tilt + 1.0) / 2.0, 14);
    draw_text(buf, 1, 7, &format!("Tilt {tilt}"), fg, bg);

    if !info.message.is_empty() {
        draw_text(buf, 1, 9, info.message, Color::Yellow, bg);
    }

    let help = if info.dead {
        "Dead: space/click rebirth | q quit"
    } else {
        "Keys: space/click pet | ←→ tilt | ↓ level | q quit"
    };
    draw_text(buf, 1, buf.h.saturating_sub(1), help, fg, bg);
}
