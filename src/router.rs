// router.rs - spot clicks and command names -> registered handlers

use std::collections::HashMap;
use std::fmt;

use glam::Vec2;

use crate::spot::{Spot, SpotKind};

/// Commands a clickable control can carry (`command="--open-spot-modal"` etc).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    OpenSpotModal,
    CloseSpotModal,
    ToggleAudio,
}

impl Command {
    pub const ALL: [Command; 3] = [
        Command::OpenSpotModal,
        Command::CloseSpotModal,
        Command::ToggleAudio,
    ];

    /// Accepts the attribute form (`--toggle-audio`) or the bare name.
    pub fn parse(attr: &str) -> Option<Self> {
        match attr.trim().trim_start_matches("--") {
            "open-spot-modal" => Some(Command::OpenSpotModal),
            "close-spot-modal" => Some(Command::CloseSpotModal),
            "toggle-audio" => Some(Command::ToggleAudio),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::OpenSpotModal => "open-spot-modal",
            Command::CloseSpotModal => "close-spot-modal",
            Command::ToggleAudio => "toggle-audio",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "--{}", self.name())
    }
}

/// Where a click came from, in overlay coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickEvent {
    pub pos: Vec2,
}

type SpotHandler<C> = Box<dyn FnMut(&mut C, &Spot, &ClickEvent)>;
type CommandHandler<C> = Box<dyn FnMut(&mut C, Option<&Spot>, &ClickEvent)>;

/// Routes clicks to handlers registered per spot kind or per command.
/// `C` is whatever state the handlers act on.
pub struct ContentRouter<C> {
    managers: HashMap<SpotKind, SpotHandler<C>>,
    commands: HashMap<Command, CommandHandler<C>>,
}

impl<C> Default for ContentRouter<C> {
    fn default() -> Self {
        Self {
            managers: HashMap::new(),
            commands: HashMap::new(),
        }
    }
}

impl<C> ContentRouter<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later registrations replace earlier ones for the same kind.
    pub fn register_manager(
        &mut self,
        kind: SpotKind,
        handler: impl FnMut(&mut C, &Spot, &ClickEvent) + 'static,
    ) {
        self.managers.insert(kind, Box::new(handler));
    }

    pub fn on_command(
        &mut self,
        command: Command,
        handler: impl FnMut(&mut C, Option<&Spot>, &ClickEvent) + 'static,
    ) {
        self.commands.insert(command, Box::new(handler));
    }

    /// Returns false (and warns) when no manager handles this kind.
    pub fn handle_spot_click(&mut self, ctx: &mut C, spot: &Spot, event: &ClickEvent) -> bool {
        match self.managers.get_mut(&spot.kind()) {
            Some(handler) => {
                log::debug!("spot {} clicked at {:?}", spot.id, event.pos);
                handler(ctx, spot, event);
                true
            }
            None => {
                log::warn!("no manager registered for spot type {:?} ({})", spot.kind(), spot.id);
                false
            }
        }
    }

    pub fn dispatch(
        &mut self,
        ctx: &mut C,
        command: Command,
        spot: Option<&Spot>,
        event: &ClickEvent,
    ) -> bool {
        match self.commands.get_mut(&command) {
            Some(handler) => {
                handler(ctx, spot, event);
                true
            }
            None => {
                log::warn!("no handler registered for command {command}");
                false
            }
        }
    }

    /// Dispatches a raw `command` attribute value.
    pub fn dispatch_attr(
        &mut self,
        ctx: &mut C,
        attr: &str,
        spot: Option<&Spot>,
        event: &ClickEvent,
    ) -> bool {
        match Command::parse(attr) {
            Some(command) => self.dispatch(ctx, command, spot, event),
            None => {
                log::warn!("unknown command attribute {attr:?}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spot::SpotRecord;

    fn spot(kind: &str) -> Spot {
        SpotRecord {
            id: Some(format!("spot-{kind}")),
            kind: kind.to_string(),
            ..Default::default()
        }
        .into_spot(0, 0)
    }

    const CLICK: ClickEvent = ClickEvent { pos: Vec2::ZERO };

    #[test]
    fn command_attribute_round_trips() {
        for c in Command::ALL {
            assert_eq!(Command::parse(&c.to_string()), Some(c));
            assert_eq!(Command::parse(c.name()), Some(c));
        }
        assert_eq!(Command::parse("--launch-rockets"), None);
    }

    #[test]
    fn clicks_go_to_the_manager_for_the_spot_kind() {
        let mut router: ContentRouter<Vec<String>> = ContentRouter::new();
        router.register_manager(SpotKind::Photo, |log, spot, _| log.push(format!("photo:{}", spot.id)));
        router.register_manager(SpotKind::Audio, |log, spot, _| log.push(format!("audio:{}", spot.id)));

        let mut log = Vec::new();
        assert!(router.handle_spot_click(&mut log, &spot("photo"), &CLICK));
        assert!(router.handle_spot_click(&mut log, &spot("audio"), &CLICK));
        assert!(!router.handle_spot_click(&mut log, &spot("gallery"), &CLICK));
        assert_eq!(log, vec!["photo:spot-photo", "audio:spot-audio"]);
    }

    #[test]
    fn commands_dispatch_with_optional_spot() {
        let mut router: ContentRouter<Vec<String>> = ContentRouter::new();
        router.on_command(Command::CloseSpotModal, |log, spot, _| {
            log.push(format!("close:{}", spot.is_some()))
        });

        let mut log = Vec::new();
        assert!(router.dispatch_attr(&mut log, "--close-spot-modal", None, &CLICK));
        assert!(!router.dispatch_attr(&mut log, "--toggle-audio", None, &CLICK));
        assert!(!router.dispatch_attr(&mut log, "--nope", None, &CLICK));
        assert_eq!(log, vec!["close:false"]);
    }
}
