// cli.rs - command line

use std::path::PathBuf;

use clap::Parser;

use crate::projector::CullPolicy;

#[derive(Parser, Debug)]
#[command(name = "tour360")]
#[command(about = "Interactive 360° panorama tour with hotspots, galleries and audio")]
pub struct Cli {
    /// Tour description (spots, galleries, audio).
    #[arg(long, default_value = "assets/tour.json")]
    pub tour: PathBuf,

    /// Panorama to show instead of the one named in the tour file.
    #[arg(long)]
    pub panorama: Option<PathBuf>,

    /// UI language (es, en).
    #[arg(long, env = "TOUR_LANG", default_value = crate::i18n::FALLBACK_LANG)]
    pub lang: String,

    /// How spots outside the view are hidden. Overrides the tour file.
    #[arg(long, value_enum)]
    pub cull: Option<CullPolicy>,

    /// Drag sensitivity in degrees per pixel.
    #[arg(long)]
    pub sensitivity: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["tour360"]).unwrap();
        assert_eq!(cli.tour, PathBuf::from("assets/tour.json"));
        assert!(cli.panorama.is_none());
        assert!(cli.cull.is_none());
    }

    #[test]
    fn overrides() {
        let cli = Cli::try_parse_from([
            "tour360",
            "--tour",
            "otro/tour.json",
            "--cull",
            "depth",
            "--sensitivity",
            "0.2",
            "--lang",
            "en",
        ])
        .unwrap();
        assert_eq!(cli.cull, Some(CullPolicy::Depth));
        assert_eq!(cli.sensitivity, Some(0.2));
        assert_eq!(cli.lang, "en");
        assert!(Cli::try_parse_from(["tour360", "--cull", "sideways"]).is_err());
    }
}
