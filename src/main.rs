use sdl2::controller::GameController;
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::ttf::Sdl2TtfContext;
use sdl2::video::FullscreenType;
use std::path::{Path, PathBuf};

mod config;
mod launch;
mod library;
mod nav;
mod pads;
mod style;
mod ui;
mod viewport;

use library::Library;
use nav::{GridContext, GridNav, InputSource, NavSink};
use ui::{Toast, ToastKind};
use viewport::Viewport;

// rumble strength/duration for a focus-move pulse
const HAPTIC_STRENGTH: u16 = 0x3fff;
const HAPTIC_MS: u32 = 30;

/// Intents recorded from one poll or key event, applied right after the
/// reader returns. Implements the collaborator callbacks; whatever the app
/// leaves unwired here is dropped silently.
#[derive(Default)]
struct Intents {
    select: Option<usize>,
    back: bool,
    settings: bool,
    up_out: bool,
    down_out: bool,
    moved: Option<(usize, InputSource)>,
    text_blur: bool,
}

impl NavSink for Intents {
    fn on_select(&mut self, index: usize) {
        self.select = Some(index);
    }
    fn on_back(&mut self) {
        self.back = true;
    }
    fn on_settings(&mut self) {
        self.settings = true;
    }
    fn on_up_out(&mut self) {
        self.up_out = true;
    }
    fn on_down_out(&mut self) {
        self.down_out = true;
    }
    fn on_focus_changed(&mut self, index: usize, source: InputSource) {
        self.moved = Some((index, source));
    }
    fn on_text_blur(&mut self) {
        self.text_blur = true;
    }
}

/// Pad-originated focus moves rumble briefly; key moves never do.
fn wants_pulse(moved: Option<(usize, InputSource)>, haptics_enabled: bool) -> bool {
    haptics_enabled && matches!(moved, Some((_, InputSource::Pad)))
}

fn pulse_pads(controllers: &mut [GameController]) {
    // best effort, failures are uninteresting
    for gc in controllers.iter_mut() {
        let _ = gc.set_rumble(HAPTIC_STRENGTH, HAPTIC_STRENGTH, HAPTIC_MS);
    }
}

fn default_carts_dir() -> PathBuf {
    if let Some(docs) = dirs::document_dir() {
        docs.join("pocket8").join("carts")
    } else if let Some(home) = dirs::home_dir() {
        home.join("pocket8").join("carts")
    } else {
        PathBuf::from("./carts")
    }
}

fn menu_labels(
    haptics: bool,
    use_joystick: bool,
    swap_buttons: bool,
    sort: library::SortBy,
) -> Vec<String> {
    let onoff = |v: bool| if v { "ON" } else { "OFF" };
    vec![
        format!("Haptics: {}", onoff(haptics)),
        format!("Joystick nav: {}", onoff(use_joystick)),
        format!("Swap A/B: {}", onoff(swap_buttons)),
        format!("Sort: {}", sort.label()),
        "Rescan library".to_string(),
        "Save config".to_string(),
        "Close".to_string(),
    ]
}

fn main() -> Result<(), String> {
    env_logger::init();

    let mut cfg = config::load_config();
    let style_cfg = style::load_style();

    // args: cart files are imported, anything else overrides the carts dir
    let mut carts_dir_arg: Option<PathBuf> = None;
    let mut import_paths: Vec<PathBuf> = Vec::new();
    for arg in std::env::args().skip(1) {
        if library::is_cart_filename(&arg) {
            import_paths.push(PathBuf::from(arg));
        } else {
            carts_dir_arg = Some(PathBuf::from(arg));
        }
    }

    let carts_dir = carts_dir_arg
        .or_else(|| cfg.carts_dir.as_ref().map(PathBuf::from))
        .unwrap_or_else(default_carts_dir);

    let mut library = Library::open(&carts_dir).map_err(|e| e.to_string())?;

    let mut toast: Option<Toast> = None;
    for path in &import_paths {
        match library.import_file(path) {
            Ok(name) => toast = Some(Toast::new(format!("Imported {}", name), ToastKind::Success)),
            Err(e) => {
                log::warn!("import failed for {}: {}", path.display(), e);
                toast = Some(Toast::new(format!("Import failed: {}", e), ToastKind::Error));
            }
        }
    }

    let sdl_ctx = sdl2::init()?;
    let video = sdl_ctx.video()?;
    let controller_subsystem = sdl_ctx.game_controller()?;

    let display_mode = video.desktop_display_mode(0)?;
    let mut is_fullscreen = cfg.fullscreen.unwrap_or(false);
    let (win_w, win_h) = if is_fullscreen {
        (display_mode.w as u32, display_mode.h as u32)
    } else {
        (1280, 800)
    };

    let mut builder = video.window("Pocket-8 Shelf", win_w, win_h);
    builder.position_centered();
    if is_fullscreen {
        builder.fullscreen_desktop();
    }
    let window = builder.build().map_err(|e| e.to_string())?;

    let mut canvas = window
        .into_canvas()
        .accelerated()
        .present_vsync()
        .build()
        .map_err(|e| e.to_string())?;

    let ttf_ctx: Sdl2TtfContext = sdl2::ttf::init().map_err(|e| e.to_string())?;

    // font path preference order: config.font_path -> FONT_PATH env -> common system fonts
    let font_path = cfg
        .font_path
        .clone()
        .or_else(|| std::env::var("FONT_PATH").ok())
        .or_else(|| {
            let candidates = [
                "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
                "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
                "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
            ];
            candidates
                .iter()
                .find(|p| Path::new(p).exists())
                .map(|s| s.to_string())
        });
    let font_path = match font_path {
        Some(p) => p,
        None => {
            return Err(
                "No TTF font found. Set font_path in config or FONT_PATH, or install DejaVu/FreeSans.".into(),
            )
        }
    };
    let font = ttf_ctx.load_font(font_path, 16).map_err(|e| e.to_string())?;

    // SDL replays device-added events for controllers already connected at
    // init, so event-driven open covers startup too.
    let mut controllers: Vec<GameController> = Vec::new();

    let colors = ui::UiColors::from_style(&style_cfg);
    let texture_creator = canvas.texture_creator();

    // three independent focus controllers: cart grid, header row, settings menu
    let mut grid_nav = GridNav::new();
    let mut header_nav = GridNav::new();
    let mut menu_nav = GridNav::new();
    let mut viewport = Viewport::new();

    let mut query = String::new();
    let mut search_active = false;
    // (filename, edit buffer) while a rename text field is open
    let mut renaming: Option<(String, String)> = None;
    let mut header_active = false;
    let mut menu_open = false;
    let mut launching = false;

    let mut haptics_enabled = cfg.haptics_enabled.unwrap_or(true);
    let mut use_joystick = cfg.use_joystick.unwrap_or(true);
    let mut swap_buttons = cfg.swap_buttons.unwrap_or(false);
    let mut sort_by = cfg.sort_by.unwrap_or(library::SortBy::LastPlayed);
    let columns = cfg.columns.unwrap_or(3).max(1);

    let mut visible = library.visible(&query, sort_by);
    let mut visible_dirty = false;
    let mut name_cache: Vec<Option<sdl2::render::Texture>> = Vec::new();

    let runner = launch::Runner::new();

    let mut event_pump = sdl_ctx.event_pump()?;

    'running: loop {
        if runner.finished() {
            launching = false;
            visible_dirty = true;
        }

        let menu_items = menu_labels(haptics_enabled, use_joystick, swap_buttons, sort_by);

        for event in event_pump.poll_iter() {
            match event {
                Event::Quit { .. } => break 'running,
                Event::ControllerDeviceAdded { which, .. } => {
                    if controller_subsystem.is_game_controller(which) {
                        match controller_subsystem.open(which) {
                            Ok(gc) => {
                                log::info!("opened controller: {}", gc.name());
                                toast = Some(Toast::new(
                                    format!("Controller connected: {}", gc.name()),
                                    ToastKind::Info,
                                ));
                                controllers.push(gc);
                            }
                            Err(e) => log::warn!("failed opening controller {}: {}", which, e),
                        }
                    }
                }
                Event::ControllerDeviceRemoved { which, .. } => {
                    controllers.retain(|c| c.instance_id() != which);
                    log::info!("controller removed: {}", which);
                }
                Event::TextInput { text, .. } => {
                    if let Some((_, buffer)) = renaming.as_mut() {
                        buffer.push_str(&text);
                    } else if search_active {
                        query.push_str(&text);
                        visible_dirty = true;
                    }
                }
                Event::KeyDown {
                    keycode: Some(key), ..
                } if renaming.is_some() => {
                    // the rename field owns the keyboard entirely
                    let Some((filename, buffer)) = renaming.as_mut() else {
                        continue;
                    };
                    match key {
                        Keycode::Return => {
                            let new_name = buffer.trim().to_string();
                            if !new_name.is_empty() {
                                match library.rename(filename, &new_name) {
                                    Ok(()) => {
                                        toast = Some(Toast::new(
                                            format!("Renamed to {}", new_name),
                                            ToastKind::Success,
                                        ));
                                        visible_dirty = true;
                                    }
                                    Err(e) => {
                                        toast = Some(Toast::new(
                                            format!("Rename failed: {}", e),
                                            ToastKind::Error,
                                        ))
                                    }
                                }
                            }
                            renaming = None;
                            video.text_input().stop();
                        }
                        Keycode::Escape => {
                            renaming = None;
                            video.text_input().stop();
                        }
                        Keycode::Backspace => {
                            buffer.pop();
                        }
                        _ => {}
                    }
                }
                Event::KeyDown {
                    keycode: Some(key), ..
                } => {
                    // readers claim events in overlay order, each against a
                    // context rebuilt from live state; a disabled reader
                    // never consumes
                    let mut intents = Intents::default();
                    let mut consumed = menu_nav.handle_key(
                        &GridContext {
                            item_count: menu_items.len(),
                            columns: 1,
                            enabled: menu_open && !launching,
                        },
                        key,
                        false,
                        &mut intents,
                    );
                    if consumed {
                        apply_menu_intents(
                            &intents,
                            &mut controllers,
                            &menu_items,
                            &mut menu_open,
                            &mut haptics_enabled,
                            &mut use_joystick,
                            &mut swap_buttons,
                            &mut sort_by,
                            &mut library,
                            &mut visible_dirty,
                            &mut toast,
                            &mut cfg,
                            &carts_dir,
                        );
                    }
                    if !consumed {
                        let mut intents = Intents::default();
                        consumed = header_nav.handle_key(
                            &GridContext {
                                item_count: 2,
                                columns: 2,
                                enabled: header_active && !launching && !menu_open,
                            },
                            key,
                            false,
                            &mut intents,
                        );
                        if consumed {
                            apply_header_intents(
                                &intents,
                                &mut controllers,
                                haptics_enabled,
                                &mut header_active,
                                &mut search_active,
                                &mut menu_open,
                                &mut menu_nav,
                                &mut grid_nav,
                                &visible,
                                &video,
                            );
                        }
                    }
                    if !consumed {
                        let mut intents = Intents::default();
                        consumed = grid_nav.handle_key(
                            &GridContext {
                                item_count: visible.len(),
                                columns,
                                enabled: !launching && !menu_open && !header_active,
                            },
                            key,
                            search_active,
                            &mut intents,
                        );
                        if consumed {
                            let (_, h) = canvas.output_size().unwrap_or((1280, 800));
                            apply_grid_intents(
                                &intents,
                                h as i32,
                                &mut viewport,
                                &mut controllers,
                                haptics_enabled,
                                &mut query,
                                &mut visible_dirty,
                                &visible,
                                &mut library,
                                &cfg,
                                &mut launching,
                                &runner,
                                &mut header_active,
                                &mut header_nav,
                                &mut menu_open,
                                &mut menu_nav,
                                &mut search_active,
                                &mut toast,
                                &video,
                            );
                        }
                    }
                    if !consumed {
                        if key == Keycode::Escape && launching {
                            match runner.kill() {
                                Ok(()) => {
                                    toast =
                                        Some(Toast::new("Stopping cartridge", ToastKind::Info))
                                }
                                Err(e) => {
                                    toast = Some(Toast::new(e.to_string(), ToastKind::Error))
                                }
                            }
                        } else if search_active {
                            if key == Keycode::Backspace {
                                query.pop();
                                visible_dirty = true;
                            } else if key == Keycode::Return {
                                // apply the query and hand focus to the grid
                                search_active = false;
                                video.text_input().stop();
                                if grid_nav.focused().is_none() && !visible.is_empty() {
                                    grid_nav.set_focus(Some(0));
                                }
                            }
                        } else {
                            match key {
                                Keycode::F11 => {
                                    if is_fullscreen {
                                        let _ =
                                            canvas.window_mut().set_fullscreen(FullscreenType::Off);
                                        is_fullscreen = false;
                                    } else {
                                        let _ = canvas
                                            .window_mut()
                                            .set_fullscreen(FullscreenType::Desktop);
                                        is_fullscreen = true;
                                    }
                                }
                                Keycode::Slash => {
                                    search_active = true;
                                    header_active = false;
                                    video.text_input().start();
                                }
                                Keycode::R => {
                                    if let Some(entry) =
                                        grid_nav.focused().and_then(|i| visible.get(i))
                                    {
                                        renaming =
                                            Some((entry.filename.clone(), entry.name.clone()));
                                        video.text_input().start();
                                    }
                                }
                                Keycode::F => {
                                    if let Some(entry) =
                                        grid_nav.focused().and_then(|i| visible.get(i))
                                    {
                                        match library.toggle_favorite(&entry.filename) {
                                            Ok(fav) => {
                                                toast = Some(Toast::new(
                                                    if fav {
                                                        format!("Favorited {}", entry.name)
                                                    } else {
                                                        format!("Unfavorited {}", entry.name)
                                                    },
                                                    ToastKind::Success,
                                                ));
                                                visible_dirty = true;
                                            }
                                            Err(e) => {
                                                toast = Some(Toast::new(
                                                    format!("Favorite failed: {}", e),
                                                    ToastKind::Error,
                                                ))
                                            }
                                        }
                                    }
                                }
                                Keycode::Delete => {
                                    if let Some(entry) =
                                        grid_nav.focused().and_then(|i| visible.get(i))
                                    {
                                        match library.delete(&entry.filename) {
                                            Ok(()) => {
                                                toast = Some(Toast::new(
                                                    format!("Deleted {}", entry.name),
                                                    ToastKind::Success,
                                                ));
                                                visible_dirty = true;
                                            }
                                            Err(e) => {
                                                toast = Some(Toast::new(
                                                    format!("Delete failed: {}", e),
                                                    ToastKind::Error,
                                                ))
                                            }
                                        }
                                    }
                                }
                                _ => {}
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        // one controller sample per display frame, fed to every focus
        // controller; disabled ones no-op but stay scheduled
        let opts = pads::PadOptions {
            use_joystick,
            swap_buttons,
        };
        let snapshots: Vec<nav::PadSnapshot> = controllers
            .iter()
            .map(|gc| pads::snapshot(gc, &opts))
            .collect();

        {
            let mut intents = Intents::default();
            menu_nav.poll_pads(
                &GridContext {
                    item_count: menu_items.len(),
                    columns: 1,
                    enabled: menu_open && !launching && renaming.is_none(),
                },
                &snapshots,
                &mut intents,
            );
            apply_menu_intents(
                &intents,
                &mut controllers,
                &menu_items,
                &mut menu_open,
                &mut haptics_enabled,
                &mut use_joystick,
                &mut swap_buttons,
                &mut sort_by,
                &mut library,
                &mut visible_dirty,
                &mut toast,
                &mut cfg,
                &carts_dir,
            );
        }
        {
            let mut intents = Intents::default();
            header_nav.poll_pads(
                &GridContext {
                    item_count: 2,
                    columns: 2,
                    enabled: header_active && !launching && !menu_open && renaming.is_none(),
                },
                &snapshots,
                &mut intents,
            );
            apply_header_intents(
                &intents,
                &mut controllers,
                haptics_enabled,
                &mut header_active,
                &mut search_active,
                &mut menu_open,
                &mut menu_nav,
                &mut grid_nav,
                &visible,
                &video,
            );
        }
        {
            let mut intents = Intents::default();
            grid_nav.poll_pads(
                &GridContext {
                    item_count: visible.len(),
                    columns,
                    enabled: !launching
                        && !menu_open
                        && !header_active
                        && renaming.is_none(),
                },
                &snapshots,
                &mut intents,
            );
            let (_, h) = canvas.output_size().unwrap_or((1280, 800));
            apply_grid_intents(
                &intents,
                h as i32,
                &mut viewport,
                &mut controllers,
                haptics_enabled,
                &mut query,
                &mut visible_dirty,
                &visible,
                &mut library,
                &cfg,
                &mut launching,
                &runner,
                &mut header_active,
                &mut header_nav,
                &mut menu_open,
                &mut menu_nav,
                &mut search_active,
                &mut toast,
                &video,
            );
        }

        if visible_dirty {
            visible = library.visible(&query, sort_by);
            name_cache.clear();
            visible_dirty = false;
        }

        // render
        let (w_u, h_u) = canvas.output_size().unwrap_or((1280, 800));
        let (w, h) = (w_u as i32, h_u as i32);
        viewport.tick();

        let empty_hint = format!(
            "No cartridges. Drop .p8 / .p8.png files into {}",
            library.carts_dir().display()
        );
        ui::render_frame(
            &mut canvas,
            &texture_creator,
            &font,
            &colors,
            &visible,
            &mut name_cache,
            grid_nav.focused(),
            if header_active {
                header_nav.focused()
            } else {
                None
            },
            search_active,
            &query,
            sort_by.label(),
            columns,
            &mut viewport,
            w,
            h,
            launching,
            &empty_hint,
        );

        if menu_open {
            ui::render_menu(
                &mut canvas,
                &texture_creator,
                &font,
                &colors,
                &menu_items,
                menu_nav.focused(),
                w,
                h,
            );
        }

        if let Some((_, buffer)) = &renaming {
            ui::render_rename(&mut canvas, &texture_creator, &font, &colors, buffer, w, h);
        }

        ui::render_toast(
            &mut canvas,
            &texture_creator,
            &font,
            &colors,
            &mut toast,
            w,
            h,
        );

        canvas.present();
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn apply_grid_intents(
    intents: &Intents,
    view_total_h: i32,
    viewport: &mut Viewport,
    controllers: &mut [GameController],
    haptics_enabled: bool,
    query: &mut String,
    visible_dirty: &mut bool,
    visible: &[library::CartEntry],
    library: &mut Library,
    cfg: &config::ConfigFile,
    launching: &mut bool,
    runner: &launch::Runner,
    header_active: &mut bool,
    header_nav: &mut GridNav,
    menu_open: &mut bool,
    menu_nav: &mut GridNav,
    search_active: &mut bool,
    toast: &mut Option<Toast>,
    video: &sdl2::VideoSubsystem,
) {
    if let Some((index, _)) = intents.moved {
        viewport.scroll_to(index, ui::grid_view_height(view_total_h));
    }
    if wants_pulse(intents.moved, haptics_enabled) {
        pulse_pads(controllers);
    }

    if let Some(index) = intents.select {
        if *search_active {
            // selecting from filtered results ends the search
            *search_active = false;
            video.text_input().stop();
        }
        if let Some(entry) = visible.get(index) {
            if let Some(tmpl) = cfg.runner.as_ref() {
                if !*launching {
                    match runner.start(tmpl, &entry.path) {
                        Ok(()) => {
                            *launching = true;
                            // a play counts only once the process is up
                            if let Err(e) = library.record_launch(&entry.filename) {
                                log::warn!("failed to record launch: {}", e);
                            }
                            *visible_dirty = true;
                            *toast = Some(Toast::new(
                                format!("Launching {}", entry.name),
                                ToastKind::Info,
                            ));
                        }
                        Err(e) => {
                            *toast = Some(Toast::new(e.to_string(), ToastKind::Error));
                        }
                    }
                }
            } else {
                *toast = Some(Toast::new("No runner configured", ToastKind::Error));
            }
        }
    }

    if intents.back && !query.is_empty() {
        query.clear();
        *visible_dirty = true;
        *toast = Some(Toast::new("Search cleared", ToastKind::Info));
    }

    if intents.settings {
        *menu_open = true;
        menu_nav.set_focus(Some(0));
    }

    if intents.up_out {
        *header_active = true;
        header_nav.set_focus(Some(0));
    }

    // down_out is unwired in the library view: nothing lives below the grid

    if intents.text_blur {
        *search_active = false;
        video.text_input().stop();
    }
}

#[allow(clippy::too_many_arguments)]
fn apply_header_intents(
    intents: &Intents,
    controllers: &mut [GameController],
    haptics_enabled: bool,
    header_active: &mut bool,
    search_active: &mut bool,
    menu_open: &mut bool,
    menu_nav: &mut GridNav,
    grid_nav: &mut GridNav,
    visible: &[library::CartEntry],
    video: &sdl2::VideoSubsystem,
) {
    if wants_pulse(intents.moved, haptics_enabled) {
        pulse_pads(controllers);
    }

    if let Some(index) = intents.select {
        match index {
            0 => {
                *search_active = true;
                *header_active = false;
                video.text_input().start();
            }
            1 => {
                *menu_open = true;
                *header_active = false;
                menu_nav.set_focus(Some(0));
            }
            _ => {}
        }
    }

    if intents.settings {
        *menu_open = true;
        *header_active = false;
        menu_nav.set_focus(Some(0));
    }

    // leaving the header at its bottom edge hands focus back to the grid
    if intents.down_out || intents.back {
        *header_active = false;
        if grid_nav.focused().is_none() && !visible.is_empty() {
            grid_nav.set_focus(Some(0));
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn apply_menu_intents(
    intents: &Intents,
    controllers: &mut [GameController],
    menu_items: &[String],
    menu_open: &mut bool,
    haptics_enabled: &mut bool,
    use_joystick: &mut bool,
    swap_buttons: &mut bool,
    sort_by: &mut library::SortBy,
    library: &mut Library,
    visible_dirty: &mut bool,
    toast: &mut Option<Toast>,
    cfg: &mut config::ConfigFile,
    carts_dir: &Path,
) {
    if wants_pulse(intents.moved, *haptics_enabled) {
        pulse_pads(controllers);
    }

    if intents.back {
        *menu_open = false;
        return;
    }

    let Some(index) = intents.select else { return };
    if index >= menu_items.len() {
        return;
    }
    match index {
        0 => {
            *haptics_enabled = !*haptics_enabled;
        }
        1 => {
            *use_joystick = !*use_joystick;
        }
        2 => {
            *swap_buttons = !*swap_buttons;
        }
        3 => {
            *sort_by = sort_by.next();
            *visible_dirty = true;
        }
        4 => match library.scan() {
            Ok(()) => {
                *visible_dirty = true;
                *toast = Some(Toast::new(
                    format!("Rescanned: {} carts", library.entries().len()),
                    ToastKind::Success,
                ));
            }
            Err(e) => {
                *toast = Some(Toast::new(format!("Rescan failed: {}", e), ToastKind::Error));
            }
        },
        5 => {
            cfg.haptics_enabled = Some(*haptics_enabled);
            cfg.use_joystick = Some(*use_joystick);
            cfg.swap_buttons = Some(*swap_buttons);
            cfg.sort_by = Some(*sort_by);
            cfg.carts_dir = Some(carts_dir.display().to_string());
            match config::write_config(cfg) {
                Ok(()) => *toast = Some(Toast::new("Config saved", ToastKind::Success)),
                Err(e) => {
                    *toast = Some(Toast::new(format!("Save failed: {}", e), ToastKind::Error))
                }
            }
        }
        6 => {
            *menu_open = false;
        }
        _ => {}
    }
}
