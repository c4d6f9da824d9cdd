// main.rs - window, event loop and startup wiring for the 360° tour

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // no console window in release builds

mod audio;
mod authoring;
mod cli;
mod config;
mod error;
mod gallery;
mod i18n;
mod media;
mod mesh;
mod modal;
mod panorama;
mod projector;
mod renderer;
mod router;
mod scene;
mod spot;
mod tour;
mod ui;

use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use glam::Vec2;
use winit::{
    dpi::LogicalSize,
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Fullscreen, Window, WindowBuilder},
};

use audio::RodioBackend;
use cli::Cli;
use config::{TourConfig, ValidationReport};
use error::TourError;
use media::ImageCache;
use panorama::{start_load_panorama, PanoramaClip, VideoPlayback};
use projector::Viewport;
use renderer::Renderer;
use tour::Tour;
use ui::{UiActions, UiState};

type PanoramaResult = Result<PanoramaClip, TourError>;

/// Reads and validates a tour file, applying command line overrides.
fn load_tour_config(path: &Path, cli: &Cli) -> anyhow::Result<(TourConfig, ValidationReport)> {
    let mut config = TourConfig::load(path)?;
    if let Some(panorama) = &cli.panorama {
        let absolute = std::fs::canonicalize(panorama).unwrap_or_else(|_| panorama.clone());
        config.panorama = absolute.display().to_string();
    }
    if let Some(cull) = cli.cull {
        config.cull_policy = cull;
    }
    let report = config
        .validate()
        .with_context(|| format!("tour {} cannot start", path.display()))?;
    log::info!(
        "{}",
        i18n::tr_with(
            "log.tour_loaded",
            &[
                ("path", path.display().to_string()),
                ("spots", (config.spots.len() + config.markers.len()).to_string()),
                ("warnings", report.warnings.len().to_string()),
            ]
        )
    );
    Ok((config, report))
}

fn build_tour(config: TourConfig, report: ValidationReport, cli: &Cli) -> anyhow::Result<Tour> {
    let mut tour = Tour::new(config, report, Box::new(RodioBackend::new()))?;
    if let Some(s) = cli.sensitivity {
        tour.presenters.scene.sensitivity = s;
    }
    tour.start();
    Ok(tour)
}

fn toggle_fullscreen(window: &Window, state: &mut UiState) {
    state.is_fullscreen = !state.is_fullscreen;
    if state.is_fullscreen {
        window.set_fullscreen(Some(Fullscreen::Borderless(None)));
    } else {
        window.set_fullscreen(None);
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    i18n::init(cli.lang.clone());

    let (config, report) = load_tour_config(&cli.tour, &cli)?;

    let event_loop = EventLoop::new();
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(i18n::tr("app.title"))
            .with_inner_size(LogicalSize::new(1280, 720))
            .build(&event_loop)
            .context("cannot create window")?,
    );

    let mut renderer = pollster::block_on(Renderer::new(window.clone(), config.sphere_radius))
        .context("cannot initialise the GPU renderer")?;
    let mut tour = build_tour(config, report, &cli)?;
    let mut images = ImageCache::new();

    let mut ui_state = UiState {
        show_fps: false,
        is_fullscreen: false,
        loading: true,
        fps: 0.0,
        current_lang: cli.lang.clone(),
        last_error: None,
        spot_bounds: None,
    };

    let (tx, rx): (Sender<PanoramaResult>, Receiver<PanoramaResult>) = channel();
    start_load_panorama(tour.panorama_path(), renderer.max_texture_dimension(), tx.clone());
    let mut playback: Option<VideoPlayback> = None;

    // pointer position in logical pixels, the unit egui and the projector share
    let mut cursor = Vec2::ZERO;

    let mut last_tick = Instant::now();
    let mut last_fps_time = Instant::now();
    let mut frame_count = 0u32;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        if let Ok(result) = rx.try_recv() {
            ui_state.loading = false;
            match result {
                Ok(clip) => {
                    let next = VideoPlayback::new(clip);
                    if let Some(name) = next.clip().source.file_name() {
                        window.set_title(&format!("{} - {}", i18n::tr("app.title"), name.to_string_lossy()));
                    }
                    playback = Some(next);
                    ui_state.last_error = None;
                }
                Err(e) => {
                    log::error!("{e}");
                    ui_state.last_error = Some(e.to_string());
                }
            }
        }

        match event {
            Event::WindowEvent { event, .. } => {
                let response = renderer.egui_state.on_event(&renderer.egui_ctx, &event);
                if response.consumed {
                    // a drag released over a widget still has to end
                    if let WindowEvent::MouseInput {
                        state: ElementState::Released,
                        ..
                    } = event
                    {
                        tour.pointer_left();
                    }
                    return;
                }

                match event {
                    WindowEvent::CloseRequested => {
                        *control_flow = ControlFlow::Exit;
                    }

                    WindowEvent::Resized(new_size) => {
                        renderer.resize(new_size);
                    }

                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        renderer.resize(*new_inner_size);
                    }

                    WindowEvent::KeyboardInput { input, .. } => {
                        if input.state == ElementState::Pressed {
                            match input.virtual_keycode {
                                Some(VirtualKeyCode::O) => {
                                    if let Some(path) = ui::pick_file("file.filter.panoramas", &ui::PANORAMA_EXTS) {
                                        ui_state.loading = true;
                                        start_load_panorama(path, renderer.max_texture_dimension(), tx.clone());
                                    }
                                }
                                Some(VirtualKeyCode::F11) => toggle_fullscreen(&window, &mut ui_state),
                                _ => {}
                            }
                        }
                    }

                    WindowEvent::CursorMoved { position, .. } => {
                        let logical = position.to_logical::<f32>(window.scale_factor());
                        cursor = Vec2::new(logical.x, logical.y);
                        tour.pointer_moved(cursor);
                    }

                    WindowEvent::MouseInput {
                        state,
                        button: MouseButton::Left,
                        ..
                    } => match state {
                        ElementState::Pressed => tour.pointer_pressed(cursor),
                        ElementState::Released => tour.pointer_released(cursor),
                    },

                    WindowEvent::CursorLeft { .. } => tour.pointer_left(),

                    WindowEvent::DroppedFile(path) => {
                        let is_tour = path
                            .extension()
                            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
                        if is_tour {
                            open_tour(&path, &cli, &mut tour, &mut renderer, &mut images, &mut ui_state, &tx);
                        } else {
                            ui_state.loading = true;
                            start_load_panorama(path, renderer.max_texture_dimension(), tx.clone());
                        }
                    }

                    _ => {}
                }
            }

            Event::RedrawRequested(_) => {
                let now = Instant::now();
                frame_count += 1;
                let since = now.duration_since(last_fps_time).as_secs_f32();
                if since >= 1.0 {
                    ui_state.fps = frame_count as f32 / since;
                    frame_count = 0;
                    last_fps_time = now;
                }
                let dt = now.duration_since(last_tick);
                last_tick = now;

                if let Some(frame) = playback.as_mut().and_then(|p| p.advance(dt)) {
                    renderer.upload_frame(frame);
                }

                // camera, then spots, then the frame that shows both
                let scale = window.scale_factor() as f32;
                let mut viewport = Viewport::fullscreen(
                    renderer.size.width as f32 / scale,
                    renderer.size.height as f32 / scale,
                );
                if let Some((min, max)) = ui_state.spot_bounds {
                    viewport = viewport.with_bounds(min, max);
                }
                let camera = tour.frame(&viewport);
                renderer.update_camera(&camera);

                let mut actions = UiActions::default();
                let render_result = renderer.render_with_ui(&window, |ctx| {
                    actions = ui::draw_ui(ctx, &mut tour, &mut images, &mut ui_state);
                });

                match render_result {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => renderer.resize(renderer.size),
                    Err(wgpu::SurfaceError::OutOfMemory) => *control_flow = ControlFlow::Exit,
                    Err(e) => log::warn!("render error: {e:?}"),
                }

                if actions.exit {
                    *control_flow = ControlFlow::Exit;
                }
                if actions.toggle_fullscreen {
                    toggle_fullscreen(&window, &mut ui_state);
                }
                if let Some(lang) = actions.language {
                    i18n::init(lang);
                    window.set_title(&i18n::tr("app.title"));
                }
                if let Some(path) = actions.open_panorama {
                    ui_state.loading = true;
                    start_load_panorama(path, renderer.max_texture_dimension(), tx.clone());
                }
                if let Some(path) = actions.open_tour {
                    open_tour(&path, &cli, &mut tour, &mut renderer, &mut images, &mut ui_state, &tx);
                }
            }

            Event::MainEventsCleared => {
                window.request_redraw();
            }

            _ => {}
        }
    });
}

/// Swaps in another tour. On failure the current one stays and the error is shown.
fn open_tour(
    path: &Path,
    cli: &Cli,
    tour: &mut Tour,
    renderer: &mut Renderer,
    images: &mut ImageCache,
    state: &mut UiState,
    tx: &Sender<PanoramaResult>,
) {
    let cli = Cli {
        panorama: None,
        tour: PathBuf::from(path),
        lang: cli.lang.clone(),
        cull: cli.cull,
        sensitivity: cli.sensitivity,
    };
    let loaded = load_tour_config(path, &cli).and_then(|(config, report)| build_tour(config, report, &cli));
    match loaded {
        Ok(next) => {
            renderer.rebuild_sphere(next.config.sphere_radius);
            images.clear();
            state.loading = true;
            state.last_error = None;
            start_load_panorama(next.panorama_path(), renderer.max_texture_dimension(), tx.clone());
            *tour = next;
        }
        Err(e) => {
            log::error!("{e:#}");
            state.last_error = Some(format!("{e:#}"));
        }
    }
}
