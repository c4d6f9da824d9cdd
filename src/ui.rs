// ui.rs - egui overlay: menus, status bar, spots, modal, audio controls

use std::path::PathBuf;

use egui::{Align2, Color32, Id, Order, Pos2, Rect, RichText, Sense, Vec2 as EVec2};
use glam::Vec2;

use crate::gallery::NavKey;
use crate::i18n::{tr, tr_with, LANGUAGES};
use crate::media::{ImageCache, MediaSlot};
use crate::modal::{ModalContent, OpenModal};
use crate::projector::{CullPolicy, Placement};
use crate::scene::{DragState, FOV_Y_DEG};
use crate::tour::Tour;

const INTRO_FADE_SECS: f32 = 0.6;
const MODAL_MEDIA_MAX: EVec2 = EVec2::new(640.0, 420.0);

/// UI state that outlives a single frame.
pub struct UiState {
    pub show_fps: bool,
    pub is_fullscreen: bool,
    pub loading: bool,
    pub fps: f32,
    pub current_lang: String,
    pub last_error: Option<String>,
    /// Screen area left free by the menu and status bars, from the last frame.
    pub spot_bounds: Option<(Vec2, Vec2)>,
}

/// Window-level requests the event loop carries out after the frame.
#[derive(Debug, Default)]
pub struct UiActions {
    pub open_tour: Option<PathBuf>,
    pub open_panorama: Option<PathBuf>,
    pub toggle_fullscreen: bool,
    pub language: Option<String>,
    pub exit: bool,
}

enum ModalIntent {
    Key(NavKey),
    Prev,
    Next,
    GoTo(usize),
    SwipeBegin(f32),
    SwipeUpdate(f32),
    SwipeEnd,
    ToggleTrack(String),
    CloseButton,
    Backdrop { inside_dialog: bool },
    Escape,
}

/// `#rgb` / `#rrggbb`; anything else is white.
pub fn parse_hex_color(s: &str) -> Color32 {
    let hex = s.trim().trim_start_matches('#');
    let channel = |i: usize, len: usize| u8::from_str_radix(hex.get(i..i + len)?, 16).ok();
    let rgb = match hex.len() {
        6 => channel(0, 2).zip(channel(2, 2)).zip(channel(4, 2)),
        3 => channel(0, 1)
            .zip(channel(1, 1))
            .zip(channel(2, 1))
            .map(|((r, g), b)| ((r * 17, g * 17), b * 17)),
        _ => None,
    };
    match rgb {
        Some(((r, g), b)) => Color32::from_rgb(r, g, b),
        None => Color32::WHITE,
    }
}

fn text_color_for(bg: Color32) -> Color32 {
    let luma = 0.299 * bg.r() as f32 + 0.587 * bg.g() as f32 + 0.114 * bg.b() as f32;
    if luma > 150.0 {
        Color32::BLACK
    } else {
        Color32::WHITE
    }
}

pub fn pick_file(filter_key: &str, exts: &[&str]) -> Option<PathBuf> {
    rfd::FileDialog::new().add_filter(tr(filter_key), exts).pick_file()
}

pub const PANORAMA_EXTS: [&str; 6] = ["gif", "webp", "png", "jpg", "jpeg", "bmp"];

pub fn draw_ui(
    ctx: &egui::Context,
    tour: &mut Tour,
    images: &mut ImageCache,
    state: &mut UiState,
) -> UiActions {
    let mut actions = UiActions::default();
    images.poll(ctx);

    draw_menu(ctx, tour, state, &mut actions);
    draw_status_bar(ctx, tour, state);
    let free = ctx.available_rect();
    state.spot_bounds = Some((Vec2::new(free.min.x, free.min.y), Vec2::new(free.max.x, free.max.y)));
    draw_spots(ctx, tour);
    draw_audio_controls(ctx, tour);
    draw_modal(ctx, tour, images);
    draw_marker_window(ctx, tour);
    draw_intro(ctx, tour);

    let scene = &tour.presenters.scene;
    if !scene.is_modal_open() && matches!(scene.drag_state(), DragState::Dragging { .. }) {
        ctx.set_cursor_icon(egui::CursorIcon::Grabbing);
    }

    actions
}

fn draw_menu(ctx: &egui::Context, tour: &mut Tour, state: &mut UiState, actions: &mut UiActions) {
    egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
        egui::menu::bar(ui, |ui| {
            ui.menu_button(tr("menu.file"), |ui| {
                if ui.button(tr("menu.open_tour")).clicked() {
                    ui.close_menu();
                    actions.open_tour = pick_file("file.filter.tours", &["json"]);
                }
                if ui.button(tr("menu.open_panorama")).clicked() {
                    ui.close_menu();
                    actions.open_panorama = pick_file("file.filter.panoramas", &PANORAMA_EXTS);
                }
                if ui.button(tr("menu.exit")).clicked() {
                    actions.exit = true;
                }
            });

            ui.menu_button(tr("menu.view"), |ui| {
                if ui.button(tr("view.reset")).clicked() {
                    tour.presenters.scene.reset_view();
                    ui.close_menu();
                }
                let fullscreen_label = if state.is_fullscreen {
                    tr("view.fullscreen.exit")
                } else {
                    tr("view.fullscreen.enter")
                };
                if ui.button(fullscreen_label).clicked() {
                    actions.toggle_fullscreen = true;
                    ui.close_menu();
                }

                ui.separator();
                ui.menu_button(tr("view.cull_policy"), |ui| {
                    for (policy, key) in [
                        (CullPolicy::DotProduct, "cull.dot"),
                        (CullPolicy::Depth, "cull.depth"),
                        (CullPolicy::Off, "cull.none"),
                    ] {
                        if ui.radio_value(&mut tour.cull_policy, policy, tr(key)).clicked() {
                            ui.close_menu();
                        }
                    }
                });
                ui.menu_button(tr("view.input_sensitivity"), |ui| {
                    ui.add(
                        egui::Slider::new(&mut tour.presenters.scene.sensitivity, 0.02..=0.5)
                            .text(tr("view.degrees_per_px")),
                    );
                });

                ui.separator();
                if ui.checkbox(&mut tour.marker_mode, tr("view.marker_mode")).clicked() {
                    ui.close_menu();
                }
                if ui.checkbox(&mut state.show_fps, tr("view.show_fps")).clicked() {
                    ui.close_menu();
                }
            });

            ui.menu_button(tr("menu.language"), |ui| {
                for (code, name) in LANGUAGES {
                    if ui
                        .radio_value(&mut state.current_lang, code.to_string(), name)
                        .clicked()
                    {
                        actions.language = Some(code.to_string());
                        ui.close_menu();
                    }
                }
            });
        });
    });
}

fn draw_status_bar(ctx: &egui::Context, tour: &Tour, state: &UiState) {
    egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            if state.loading {
                ui.label(RichText::new(tr("status.loading_panorama")).color(Color32::YELLOW));
                ui.label("|");
            }

            let o = tour.presenters.scene.orientation;
            ui.label(format!("Lon: {:.1}°", o.lon));
            ui.label("|");
            ui.label(format!("Lat: {:.1}°", o.lat));
            ui.label("|");
            ui.label(format!("FOV: {FOV_Y_DEG:.0}°"));
            ui.label("|");
            ui.label(tr_with(
                "status.spots",
                &[
                    ("visible", tour.spots.visible_count().to_string()),
                    ("total", tour.spots.len().to_string()),
                ],
            ));

            if !tour.warnings.is_empty() {
                ui.label("|");
                ui.label(
                    RichText::new(tr_with(
                        "status.warnings",
                        &[("count", tour.warnings.len().to_string())],
                    ))
                    .color(Color32::from_rgb(249, 115, 22)),
                )
                .on_hover_text(tour.warnings.join("\n"));
            }

            if let Some(err) = &state.last_error {
                ui.label("|");
                ui.label(RichText::new(err).color(Color32::RED));
            }

            if state.show_fps {
                ui.label("|");
                ui.label(RichText::new(format!("FPS: {:.1}", state.fps)).color(Color32::GREEN));
            }
        });
    });
}

fn draw_spots(ctx: &egui::Context, tour: &mut Tour) {
    let mut sizes = Vec::new();
    let mut clicked = None;

    for entry in tour.spots.entries() {
        let Placement::Visible(pos) = entry.placement else {
            continue;
        };
        let bg = parse_hex_color(&entry.spot.color);
        let mut button = egui::Button::new(
            RichText::new(&entry.spot.label)
                .color(text_color_for(bg))
                .strong(),
        )
        .fill(bg)
        .rounding(14.0);
        if entry.active {
            button = button.stroke(egui::Stroke::new(3.0, Color32::from_rgb(34, 197, 94)));
        }

        let area = egui::Area::new(Id::new(("spot", entry.spot.id.as_str())))
            .order(Order::Middle)
            .fixed_pos(Pos2::new(pos.x, pos.y))
            .show(ctx, |ui| {
                let response = ui.add(button);
                let hover = entry.spot.title.as_deref().unwrap_or(&entry.spot.label);
                response.on_hover_text(hover)
            });

        let size = area.response.rect.size();
        sizes.push((entry.spot.id.clone(), Vec2::new(size.x, size.y)));
        if area.inner.clicked() {
            let at = area
                .inner
                .interact_pointer_pos()
                .unwrap_or(area.response.rect.center());
            clicked = Some((entry.spot.id.clone(), Vec2::new(at.x, at.y)));
        }
    }

    for (id, size) in sizes {
        tour.spots.set_element_size(&id, size);
    }
    if let Some((id, pos)) = clicked {
        tour.click_spot(&id, pos);
    }
}

fn draw_audio_controls(ctx: &egui::Context, tour: &mut Tour) {
    let Some(cycle) = tour.presenters.audio.cycle() else {
        return;
    };
    let shown = cycle.shown_index();
    let track_count = cycle.tracks.len();
    let muted = tour.presenters.audio.is_muted();
    let failure = tour
        .presenters
        .audio
        .last_failure()
        .map(|(key, msg)| format!("{key}: {msg}"));

    let mut advance = false;
    let mut toggle_mute = false;
    egui::Area::new("audio_controls")
        .order(Order::Middle)
        .anchor(Align2::RIGHT_BOTTOM, [-16.0, -40.0])
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                ui.horizontal(|ui| {
                    let label = if shown < 0 {
                        tr("audio.ambient")
                    } else {
                        tr_with(
                            "audio.interview",
                            &[
                                ("n", (shown + 1).to_string()),
                                ("total", track_count.to_string()),
                            ],
                        )
                    };
                    if ui.button(format!("🎧 {label}")).clicked() {
                        advance = true;
                    }
                    let mute_label = if muted { tr("audio.unmute") } else { tr("audio.mute") };
                    if ui.button(mute_label).clicked() {
                        toggle_mute = true;
                    }
                });
                if let Some(f) = &failure {
                    ui.label(
                        RichText::new(tr_with("audio.failed", &[("err", f.clone())]))
                            .color(Color32::RED)
                            .small(),
                    );
                }
            });
        });

    if advance {
        tour.presenters.audio.advance_cycle();
    }
    if toggle_mute {
        tour.presenters.audio.toggle_mute();
    }
}

fn fit_size(tex: EVec2, max: EVec2) -> EVec2 {
    if tex.x <= 0.0 || tex.y <= 0.0 {
        return max;
    }
    let scale = (max.x / tex.x).min(max.y / tex.y).min(1.0);
    tex * scale
}

fn draw_media(ui: &mut egui::Ui, images: &mut ImageCache, path: PathBuf, alt: &str) {
    match images.get(path) {
        MediaSlot::Ready(tex) => {
            let size = fit_size(tex.size_vec2(), MODAL_MEDIA_MAX);
            ui.image(egui::ImageSource::Texture((tex.id(), size).into()));
        }
        MediaSlot::Loading => {
            ui.spinner();
        }
        MediaSlot::Failed(_) => {
            ui.label(RichText::new(tr_with("modal.image_failed", &[("alt", alt.to_string())])).italics());
        }
    }
}

fn draw_modal(ctx: &egui::Context, tour: &mut Tour, images: &mut ImageCache) {
    let Some(open) = tour.presenters.modal.current().cloned() else {
        return;
    };
    let mut intents = Vec::new();

    let screen = ctx.screen_rect();
    let backdrop = egui::Area::new("modal_backdrop")
        .order(Order::Foreground)
        .fixed_pos(screen.min)
        .show(ctx, |ui| {
            let response = ui.allocate_response(screen.size(), Sense::click());
            ui.painter()
                .rect_filled(screen, 0.0, Color32::from_black_alpha(170));
            response
        });
    let dialog_id = Id::new("modal_dialog");
    ctx.move_to_top(egui::LayerId::new(Order::Foreground, dialog_id));
    let dialog = egui::Area::new(dialog_id)
        .order(Order::Foreground)
        .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            egui::Frame::window(ui.style()).show(ui, |ui| {
                ui.set_max_width(MODAL_MEDIA_MAX.x + 32.0);
                draw_modal_body(ui, tour, images, &open, &mut intents);
            });
        });
    if backdrop.inner.clicked() {
        let inside_dialog = backdrop
            .inner
            .interact_pointer_pos()
            .is_some_and(|p| dialog.response.rect.contains(p));
        intents.push(ModalIntent::Backdrop { inside_dialog });
    }

    ctx.input(|i| {
        if i.key_pressed(egui::Key::Escape) {
            intents.push(ModalIntent::Escape);
        }
        if matches!(open.content, ModalContent::Gallery(_)) {
            if i.key_pressed(egui::Key::ArrowLeft) {
                intents.push(ModalIntent::Key(NavKey::Left));
            }
            if i.key_pressed(egui::Key::ArrowRight) {
                intents.push(ModalIntent::Key(NavKey::Right));
            }
        }
    });

    apply_modal_intents(tour, intents);
}

fn draw_modal_body(
    ui: &mut egui::Ui,
    tour: &Tour,
    images: &mut ImageCache,
    open: &OpenModal,
    intents: &mut Vec<ModalIntent>,
) {
    ui.horizontal(|ui| {
        ui.heading(&open.title);
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.button("✕").on_hover_text(tr("modal.close")).clicked() {
                intents.push(ModalIntent::CloseButton);
            }
        });
    });
    if let Some(desc) = &open.description {
        ui.label(desc);
    }
    ui.separator();

    match &open.content {
        ModalContent::Photo { media, caption } => {
            match media {
                Some(m) => {
                    draw_media(ui, images, tour.resolve_media(m), caption.as_deref().unwrap_or(""));
                }
                None => {
                    ui.label(RichText::new(tr("modal.no_media")).italics());
                }
            }
            if let Some(c) = caption {
                ui.label(RichText::new(c).italics());
            }
        }
        ModalContent::Gallery(carousel) => {
            let Some(item) = carousel.current() else {
                ui.label(tr("modal.placeholder"));
                return;
            };
            let path = tour.resolve_media(&item.src);
            let slot_rect = ui.allocate_exact_size(MODAL_MEDIA_MAX, Sense::drag());
            let (rect, response) = slot_rect;
            let painter = ui.painter_at(rect);
            match images.get(path) {
                MediaSlot::Ready(tex) => {
                    let size = fit_size(tex.size_vec2(), MODAL_MEDIA_MAX);
                    let target = Rect::from_center_size(rect.center(), size)
                        .translate(EVec2::new(carousel.swipe_offset(), 0.0));
                    painter.image(
                        tex.id(),
                        target,
                        Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                        Color32::WHITE,
                    );
                }
                MediaSlot::Loading => {
                    painter.text(
                        rect.center(),
                        Align2::CENTER_CENTER,
                        tr("modal.loading"),
                        egui::FontId::proportional(16.0),
                        Color32::GRAY,
                    );
                }
                MediaSlot::Failed(_) => {
                    painter.text(
                        rect.center(),
                        Align2::CENTER_CENTER,
                        tr_with("modal.image_failed", &[("alt", item.alt.clone())]),
                        egui::FontId::proportional(16.0),
                        Color32::GRAY,
                    );
                }
            }

            // swipe gestures stay inside the dialog; the scene never sees them
            if let Some(p) = response.interact_pointer_pos() {
                if response.drag_started() {
                    intents.push(ModalIntent::SwipeBegin(p.x));
                } else if response.dragged() {
                    intents.push(ModalIntent::SwipeUpdate(p.x));
                }
            }
            if response.drag_released() {
                intents.push(ModalIntent::SwipeEnd);
            }

            if !item.alt.is_empty() {
                ui.label(RichText::new(&item.alt).italics());
            }

            ui.horizontal(|ui| {
                if ui
                    .add_enabled(carousel.has_prev(), egui::Button::new("◀"))
                    .clicked()
                {
                    intents.push(ModalIntent::Prev);
                }
                for i in 0..carousel.len() {
                    let dot = if i == carousel.index() { "●" } else { "○" };
                    if ui.selectable_label(i == carousel.index(), dot).clicked() {
                        intents.push(ModalIntent::GoTo(i));
                    }
                }
                if ui
                    .add_enabled(carousel.has_next(), egui::Button::new("▶"))
                    .clicked()
                {
                    intents.push(ModalIntent::Next);
                }
            });
        }
        ModalContent::Audio { tracks } => {
            if tracks.is_empty() {
                ui.label(tr("modal.no_tracks"));
            }
            for track in tracks {
                ui.horizontal(|ui| {
                    let active = tour.is_track_active(&track.src);
                    let icon = if active { "⏸" } else { "▶" };
                    if ui.button(icon).clicked() {
                        intents.push(ModalIntent::ToggleTrack(track.src.clone()));
                    }
                    let text = RichText::new(&track.title);
                    ui.label(if active { text.strong() } else { text });
                });
            }
        }
        ModalContent::Placeholder => {
            ui.label(RichText::new(tr("modal.placeholder")).italics());
        }
    }
}

fn apply_modal_intents(tour: &mut Tour, intents: Vec<ModalIntent>) {
    for intent in intents {
        let carousel = match tour.presenters.modal.current_mut() {
            Some(OpenModal {
                content: ModalContent::Gallery(c),
                ..
            }) => Some(c),
            _ => None,
        };
        match intent {
            ModalIntent::Key(key) => {
                if let Some(c) = carousel {
                    c.handle_key(key);
                }
            }
            ModalIntent::Prev => {
                if let Some(c) = carousel {
                    c.prev();
                }
            }
            ModalIntent::Next => {
                if let Some(c) = carousel {
                    c.next();
                }
            }
            ModalIntent::GoTo(i) => {
                if let Some(c) = carousel {
                    c.go_to(i);
                }
            }
            ModalIntent::SwipeBegin(x) => {
                if let Some(c) = carousel {
                    c.begin_swipe(x);
                }
            }
            ModalIntent::SwipeUpdate(x) => {
                if let Some(c) = carousel {
                    c.update_swipe(x);
                }
            }
            ModalIntent::SwipeEnd => {
                if let Some(c) = carousel {
                    c.end_swipe();
                }
            }
            ModalIntent::ToggleTrack(src) => {
                tour.toggle_track(&src);
            }
            ModalIntent::CloseButton => {
                tour.dispatch_attr("--close-spot-modal", None, Vec2::ZERO);
            }
            ModalIntent::Backdrop { inside_dialog } => {
                tour.backdrop_click(inside_dialog);
            }
            ModalIntent::Escape => {
                tour.key_escape();
            }
        }
    }
}

fn draw_marker_window(ctx: &egui::Context, tour: &mut Tour) {
    if !tour.marker_mode {
        return;
    }
    let mut open = true;
    egui::Window::new(tr("marker.title"))
        .open(&mut open)
        .default_pos([16.0, 48.0])
        .resizable(false)
        .show(ctx, |ui| match &tour.last_pick {
            Some(pick) => {
                let json = pick.to_json();
                ui.label(tr_with(
                    "marker.position",
                    &[
                        ("lon", format!("{:.2}", pick.spherical.lon)),
                        ("lat", format!("{:.2}", pick.spherical.lat)),
                    ],
                ));
                ui.code(&json);
                if ui.button(tr("marker.copy")).clicked() {
                    ctx.output_mut(|o| o.copied_text = json);
                }
            }
            None => {
                ui.label(tr("marker.hint"));
            }
        });
    if !open {
        tour.marker_mode = false;
    }
}

fn draw_intro(ctx: &egui::Context, tour: &mut Tour) {
    let Some(intro) = tour.config.intro.clone() else {
        return;
    };
    let alpha = ctx.animate_bool_with_time(Id::new("intro_fade"), tour.intro_visible, INTRO_FADE_SECS);
    if alpha <= 0.0 {
        return;
    }

    let screen = ctx.screen_rect();
    let mut enter = false;
    egui::Area::new("intro")
        .order(Order::Foreground)
        .fixed_pos(screen.min)
        .show(ctx, |ui| {
            let (rect, _) = ui.allocate_exact_size(screen.size(), Sense::click());
            ui.painter()
                .rect_filled(rect, 0.0, Color32::from_black_alpha((230.0 * alpha) as u8));
            let fade = |c: Color32| c.gamma_multiply(alpha);
            ui.painter().text(
                rect.center() - EVec2::new(0.0, 60.0),
                Align2::CENTER_CENTER,
                &intro.title,
                egui::FontId::proportional(42.0),
                fade(Color32::WHITE),
            );
            if let Some(sub) = &intro.subtitle {
                ui.painter().text(
                    rect.center() - EVec2::new(0.0, 16.0),
                    Align2::CENTER_CENTER,
                    sub,
                    egui::FontId::proportional(20.0),
                    fade(Color32::LIGHT_GRAY),
                );
            }
            let button_rect = Rect::from_center_size(rect.center() + EVec2::new(0.0, 40.0), EVec2::new(160.0, 40.0));
            if tour.intro_visible
                && ui
                    .put(button_rect, egui::Button::new(RichText::new(tr("intro.enter")).size(18.0)))
                    .clicked()
            {
                enter = true;
            }
        });

    if enter {
        tour.dismiss_intro();
    }
}
