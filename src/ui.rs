use sdl2::pixels::Color;
use sdl2::rect::Rect;
use sdl2::render::{Texture, TextureCreator, WindowCanvas};
use sdl2::ttf::Font;
use sdl2::video::WindowContext;
use std::time::Instant;

use crate::library::CartEntry;
use crate::style::StyleConfig;
use crate::viewport::{Slot, Viewport};

pub const HEADER_H: i32 = 48;
pub const TILE_H: i32 = 96;
pub const PADDING: i32 = 10;
const TOAST_SECS: u64 = 2;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

/// One transient status message; replaced by the next one, auto-hidden
/// after a couple of seconds.
pub struct Toast {
    pub text: String,
    pub kind: ToastKind,
    pub shown_at: Instant,
}

impl Toast {
    pub fn new(text: impl Into<String>, kind: ToastKind) -> Self {
        Toast {
            text: text.into(),
            kind,
            shown_at: Instant::now(),
        }
    }
}

pub struct UiColors {
    pub background: Color,
    pub tile_normal: Color,
    pub tile_focused: Color,
    pub tile_favorite: Color,
    pub text_primary: Color,
    pub text_secondary: Color,
    pub header_bg: Color,
    pub header_text: Color,
    pub header_focused: Color,
    pub menu_bg: Color,
    pub menu_box: Color,
    pub menu_selected: Color,
    pub menu_text: Color,
    pub toast_success: Color,
    pub toast_error: Color,
    pub toast_info: Color,
    pub overlay: Color,
}

fn rgb(v: Option<[u8; 3]>, fallback: [u8; 3]) -> Color {
    let [r, g, b] = v.unwrap_or(fallback);
    Color::RGB(r, g, b)
}

impl UiColors {
    pub fn from_style(s: &StyleConfig) -> Self {
        let overlay_rgb = s.overlay_bg.unwrap_or([0, 0, 0]);
        UiColors {
            background: rgb(s.background, [16, 12, 24]),
            tile_normal: rgb(s.tile_normal, [50, 46, 62]),
            tile_focused: rgb(s.tile_focused, [255, 163, 0]),
            tile_favorite: rgb(s.tile_favorite, [255, 119, 168]),
            text_primary: rgb(s.text_primary, [240, 240, 240]),
            text_secondary: rgb(s.text_secondary, [170, 170, 180]),
            header_bg: rgb(s.header_bg, [24, 20, 36]),
            header_text: rgb(s.header_text, [220, 220, 220]),
            header_focused: rgb(s.header_focused, [255, 163, 0]),
            menu_bg: rgb(s.menu_bg, [10, 10, 16]),
            menu_box: rgb(s.menu_box, [40, 36, 52]),
            menu_selected: rgb(s.menu_selected, [80, 74, 96]),
            menu_text: rgb(s.menu_text, [220, 220, 220]),
            toast_success: rgb(s.toast_success, [0, 180, 90]),
            toast_error: rgb(s.toast_error, [200, 60, 60]),
            toast_info: rgb(s.toast_info, [60, 100, 200]),
            overlay: Color::RGBA(
                overlay_rgb[0],
                overlay_rgb[1],
                overlay_rgb[2],
                s.overlay_alpha.unwrap_or(200),
            ),
        }
    }
}

/// Keep the start and end of an over-long name, eliding the middle.
pub fn elide_middle(s: &str, max_chars: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_chars {
        return s.to_string();
    }
    if max_chars <= 3 {
        return "...".to_string();
    }
    let keep = (max_chars - 3) / 2;
    let head = keep + ((max_chars - 3) % 2);
    let start: String = chars.iter().take(head).collect();
    let end: String = chars[chars.len() - keep..].iter().collect();
    format!("{}...{}", start, end)
}

fn draw_text(
    canvas: &mut WindowCanvas,
    texture_creator: &TextureCreator<WindowContext>,
    font: &Font,
    text: &str,
    color: Color,
    x: i32,
    y: i32,
) {
    if text.is_empty() {
        return;
    }
    if let Ok(surface) = font.render(text).blended(color) {
        if let Ok(tex) = texture_creator.create_texture_from_surface(&surface) {
            let q = tex.query();
            let _ = canvas.copy(&tex, None, Rect::new(x, y, q.width, q.height));
        }
    }
}

/// Vertical space available to the grid below the header.
pub fn grid_view_height(h: i32) -> i32 {
    (h - HEADER_H - PADDING * 2).max(1)
}

/// Render the header band, the cart grid, and the launching overlay.
///
/// Every laid-out tile registers its slot with the viewport, so the scroll
/// synchronizer can center whatever gains focus next frame.
#[allow(clippy::too_many_arguments)]
pub fn render_frame<'a>(
    canvas: &mut WindowCanvas,
    texture_creator: &'a TextureCreator<WindowContext>,
    font: &Font,
    colors: &UiColors,
    entries: &[CartEntry],
    name_cache: &mut Vec<Option<Texture<'a>>>,
    grid_focus: Option<usize>,
    header_focus: Option<usize>,
    search_active: bool,
    query: &str,
    sort_label: &str,
    columns: usize,
    viewport: &mut Viewport,
    w: i32,
    h: i32,
    launching: bool,
    empty_hint: &str,
) {
    canvas.set_draw_color(colors.background);
    canvas.clear();

    // --- header band: search box (slot 0) and menu button (slot 1) ---
    canvas.set_draw_color(colors.header_bg);
    let _ = canvas.fill_rect(Rect::new(0, 0, w as u32, HEADER_H as u32));

    let search_w = w / 2 - PADDING * 2;
    let search_rect = Rect::new(PADDING, 8, search_w.max(40) as u32, (HEADER_H - 16) as u32);
    let search_hot = header_focus == Some(0) || search_active;
    canvas.set_draw_color(if search_hot {
        colors.header_focused
    } else {
        colors.tile_normal
    });
    let _ = canvas.fill_rect(search_rect);
    let search_text = if query.is_empty() && !search_active {
        "Search".to_string()
    } else if search_active {
        format!("{}_", query)
    } else {
        query.to_string()
    };
    draw_text(
        canvas,
        texture_creator,
        font,
        &search_text,
        colors.text_primary,
        PADDING + 8,
        14,
    );

    let menu_hot = header_focus == Some(1);
    let menu_rect = Rect::new(w / 2 + PADDING, 8, 90, (HEADER_H - 16) as u32);
    canvas.set_draw_color(if menu_hot {
        colors.header_focused
    } else {
        colors.tile_normal
    });
    let _ = canvas.fill_rect(menu_rect);
    draw_text(
        canvas,
        texture_creator,
        font,
        "Menu",
        colors.text_primary,
        w / 2 + PADDING + 8,
        14,
    );

    let status = format!("{} carts · sort: {}", entries.len(), sort_label);
    if let Ok((sw, _)) = font.size_of(&status) {
        draw_text(
            canvas,
            texture_creator,
            font,
            &status,
            colors.header_text,
            w - sw as i32 - PADDING,
            14,
        );
    }

    // --- cart grid ---
    let cols = columns.max(1);
    let grid_top = HEADER_H + PADDING;
    let tile_w = ((w - PADDING * (cols as i32 + 1)) / cols as i32).max(40);

    viewport.begin_layout();
    if name_cache.len() != entries.len() {
        name_cache.clear();
        name_cache.resize_with(entries.len(), || None);
    }

    if entries.is_empty() {
        draw_text(
            canvas,
            texture_creator,
            font,
            empty_hint,
            colors.text_secondary,
            PADDING,
            grid_top + PADDING,
        );
    }

    for (i, entry) in entries.iter().enumerate() {
        let row = (i / cols) as i32;
        let col = (i % cols) as i32;
        let content_y = row * (TILE_H + PADDING);
        viewport.register(i, Slot { y: content_y, h: TILE_H + PADDING });

        let x = PADDING + col * (tile_w + PADDING);
        let y = grid_top + content_y - viewport.offset();
        if y + TILE_H < grid_top || y > h {
            continue;
        }

        canvas.set_draw_color(if grid_focus == Some(i) {
            colors.tile_focused
        } else if entry.meta.favorite {
            colors.tile_favorite
        } else {
            colors.tile_normal
        });
        let _ = canvas.fill_rect(Rect::new(x, y, tile_w as u32, TILE_H as u32));

        // cart name, cached lazily per entry (invalidated with the list)
        if name_cache.get(i).map(|t| t.is_none()).unwrap_or(false) {
            let avail = (tile_w - 16).max(8) as u32;
            let mut label = entry.name.clone();
            if font.size_of(&label).map(|(lw, _)| lw).unwrap_or(0) > avail {
                // estimate fitting chars from average glyph width
                let est = ((avail as f32) / 7.0) as usize;
                label = elide_middle(&label, est.max(8));
            }
            if let Ok(surface) = font.render(&label).blended(colors.text_primary) {
                if let Ok(tex) = texture_creator.create_texture_from_surface(&surface) {
                    name_cache[i] = Some(tex);
                }
            }
        }
        if let Some(Some(tex)) = name_cache.get(i) {
            let q = tex.query();
            let dst_x = x + (tile_w - q.width as i32) / 2;
            let dst_y = y + (TILE_H - q.height as i32) / 2;
            let _ = canvas.copy(tex, None, Rect::new(dst_x, dst_y, q.width, q.height));
        }
        if entry.meta.play_count > 0 {
            let plays = format!("played {}x", entry.meta.play_count);
            draw_text(
                canvas,
                texture_creator,
                font,
                &plays,
                colors.text_secondary,
                x + 8,
                y + TILE_H - 20,
            );
        }
    }

    // launching overlay
    if launching {
        canvas.set_draw_color(colors.overlay);
        let _ = canvas.fill_rect(Rect::new(0, 0, w as u32, h as u32));
        draw_text(
            canvas,
            texture_creator,
            font,
            "Running cartridge... (Esc to stop)",
            colors.text_primary,
            PADDING,
            h / 2,
        );
    }
}

/// Render the settings menu overlay with its own focus highlight.
pub fn render_menu(
    canvas: &mut WindowCanvas,
    texture_creator: &TextureCreator<WindowContext>,
    font: &Font,
    colors: &UiColors,
    items: &[String],
    selected: Option<usize>,
    w: i32,
    h: i32,
) {
    canvas.set_draw_color(colors.menu_bg);
    let _ = canvas.fill_rect(Rect::new(0, 0, w as u32, h as u32));

    let box_w = w / 2;
    let box_h = (items.len() as i32) * 28 + 48;
    let box_x = (w - box_w) / 2;
    let box_y = (h - box_h) / 2;
    canvas.set_draw_color(colors.menu_box);
    let _ = canvas.fill_rect(Rect::new(box_x, box_y, box_w as u32, box_h as u32));

    draw_text(
        canvas,
        texture_creator,
        font,
        "Settings",
        colors.menu_text,
        box_x + 12,
        box_y + 10,
    );

    for (i, item) in items.iter().enumerate() {
        let y = box_y + 44 + (i as i32) * 28;
        if selected == Some(i) {
            canvas.set_draw_color(colors.menu_selected);
            let _ = canvas.fill_rect(Rect::new(box_x + 8, y - 4, (box_w - 16) as u32, 28));
        }
        draw_text(
            canvas,
            texture_creator,
            font,
            item,
            colors.menu_text,
            box_x + 16,
            y,
        );
    }
}

/// Render the rename text field over the grid.
pub fn render_rename(
    canvas: &mut WindowCanvas,
    texture_creator: &TextureCreator<WindowContext>,
    font: &Font,
    colors: &UiColors,
    buffer: &str,
    w: i32,
    h: i32,
) {
    let box_w = (w / 2).max(240);
    let box_h = 72;
    let box_x = (w - box_w) / 2;
    let box_y = (h - box_h) / 2;
    canvas.set_draw_color(colors.menu_box);
    let _ = canvas.fill_rect(Rect::new(box_x, box_y, box_w as u32, box_h as u32));

    draw_text(
        canvas,
        texture_creator,
        font,
        "Rename (Enter to save, Esc to cancel)",
        colors.text_secondary,
        box_x + 12,
        box_y + 10,
    );
    draw_text(
        canvas,
        texture_creator,
        font,
        &format!("{}_", buffer),
        colors.menu_text,
        box_x + 12,
        box_y + 38,
    );
}

/// Render and auto-expire the toast message band.
pub fn render_toast(
    canvas: &mut WindowCanvas,
    texture_creator: &TextureCreator<WindowContext>,
    font: &Font,
    colors: &UiColors,
    toast: &mut Option<Toast>,
    w: i32,
    h: i32,
) {
    let expired = toast
        .as_ref()
        .map(|t| t.shown_at.elapsed().as_secs() >= TOAST_SECS)
        .unwrap_or(false);
    if expired {
        *toast = None;
    }
    if let Some(t) = toast {
        let band = match t.kind {
            ToastKind::Success => colors.toast_success,
            ToastKind::Error => colors.toast_error,
            ToastKind::Info => colors.toast_info,
        };
        canvas.set_draw_color(band);
        let _ = canvas.fill_rect(Rect::new(0, h - 44, w as u32, 44));
        draw_text(
            canvas,
            texture_creator,
            font,
            &t.text,
            colors.text_primary,
            PADDING,
            h - 32,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elide_keeps_short_names() {
        assert_eq!(elide_middle("celeste", 20), "celeste");
    }

    #[test]
    fn elide_keeps_head_and_tail() {
        let out = elide_middle("a_very_long_cartridge_name", 11);
        assert_eq!(out.chars().count(), 11);
        assert!(out.starts_with("a_ve"));
        assert!(out.ends_with("name"));
        assert!(out.contains("..."));
    }

    #[test]
    fn elide_degenerates_to_dots() {
        assert_eq!(elide_middle("abcdefgh", 3), "...");
    }
}
