//! Transcoder command synthesis
//!
//! Turns an [`ExportPlan`] into a [`CommandSpec`]: inputs, one filter graph
//! and output parameters. Nothing here touches the filesystem or spawns a
//! process; concat lists are materialized by the monitor.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::domain::errors::DomainError;
use crate::domain::model::CameraId;
use crate::engine::encoder::VideoEncoder;
use crate::engine::layout::GridLayout;
use crate::engine::overlay::escape_quoted;
use crate::engine::{ExportOptions, QualityTier};
use crate::planner::{CameraPlan, ExportPlan};

/// Label of the final video stream in the filter graph
pub const VIDEO_OUTPUT_LABEL: &str = "vout";

/// Shortest input worth reading after a sync shift
const MIN_INPUT_SECS: f64 = 0.1;

/// Where an input's frames come from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "paths", rename_all = "snake_case")]
pub enum InputSource {
    File(PathBuf),
    /// Files played back to back through a generated concat list
    Concat(Vec<PathBuf>),
}

/// One transcoder input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputSpec {
    pub camera: CameraId,
    pub source: InputSource,
    /// Seconds skipped at the start of the stream
    pub seek: f64,
    /// Seconds read from the stream
    pub duration: f64,
}

/// Declarative transcoder invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandSpec {
    pub inputs: Vec<InputSpec>,
    pub filter_graph: String,
    /// Input index whose audio is mapped
    pub audio_input: Option<usize>,
    pub encoder: VideoEncoder,
    pub encoder_args: Vec<String>,
    pub output: PathBuf,
    /// Planned output length in seconds
    pub duration: f64,
    pub width: u32,
    pub height: u32,
}

impl CommandSpec {
    /// Inputs that need a concat list, with their files in order
    pub fn concat_inputs(&self) -> impl Iterator<Item = (usize, &[PathBuf])> {
        self.inputs
            .iter()
            .enumerate()
            .filter_map(|(index, input)| match &input.source {
                InputSource::Concat(paths) => Some((index, paths.as_slice())),
                InputSource::File(_) => None,
            })
    }

    /// Full argument list. `concat_lists` maps input index to the list file
    /// written for it; missing entries get a placeholder name.
    pub fn args(&self, concat_lists: &BTreeMap<usize, PathBuf>) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-nostdin", "-y"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        for (index, input) in self.inputs.iter().enumerate() {
            let path = match &input.source {
                InputSource::File(path) => path.clone(),
                InputSource::Concat(_) => {
                    args.extend(["-f", "concat", "-safe", "0"].map(String::from));
                    concat_lists
                        .get(&index)
                        .cloned()
                        .unwrap_or_else(|| PathBuf::from(format!("concat-{}.txt", input.camera)))
                }
            };
            args.extend([
                "-ss".to_string(),
                format_secs(input.seek),
                "-t".to_string(),
                format_secs(input.duration),
                "-i".to_string(),
                path.to_string_lossy().into_owned(),
            ]);
        }

        args.push("-filter_complex".to_string());
        args.push(self.filter_graph.clone());
        args.push("-map".to_string());
        args.push(format!("[{}]", VIDEO_OUTPUT_LABEL));

        match self.audio_input {
            Some(index) => args.extend([
                "-map".to_string(),
                format!("{}:a?", index),
                "-c:a".to_string(),
                "aac".to_string(),
                "-b:a".to_string(),
                "128k".to_string(),
            ]),
            None => args.push("-an".to_string()),
        }

        args.extend(self.encoder_args.iter().cloned());
        args.extend([
            "-t".to_string(),
            format_secs(self.duration),
            "-movflags".to_string(),
            "+faststart".to_string(),
            self.output.to_string_lossy().into_owned(),
        ]);
        args
    }

    /// Arguments with placeholder concat list names, for previews
    pub fn preview_args(&self) -> Vec<String> {
        self.args(&BTreeMap::new())
    }

    /// Human-readable command line
    pub fn command_line(&self, program: &Path) -> String {
        std::iter::once(program.to_string_lossy().into_owned())
            .chain(self.preview_args())
            .map(|arg| shell_quote(&arg))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Contents of a concat list: one `file '<path>'` line per source
pub fn concat_list_contents(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| format!("file '{}'\n", escape_quoted(&path.to_string_lossy())))
        .collect()
}

fn format_secs(seconds: f64) -> String {
    format!("{:.3}", seconds.max(0.0))
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+,@%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", escape_quoted(arg))
    }
}

/// Builds transcoder commands for one set of export options
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    options: ExportOptions,
    encoder: VideoEncoder,
}

impl CommandBuilder {
    pub fn new(options: ExportOptions, encoder: VideoEncoder) -> Self {
        Self { options, encoder }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    pub fn build(&self, plan: &ExportPlan) -> Result<CommandSpec, DomainError> {
        if plan.cameras.is_empty() {
            return Err(DomainError::EmptyExport {
                requested: plan.range.cameras.clone(),
            });
        }
        if self.options.output.as_os_str().is_empty() {
            return Err(DomainError::BadArgs("output path is empty".to_string()));
        }

        let inputs: Vec<InputSpec> = plan.cameras.iter().map(Self::input_for).collect();
        let layout = GridLayout::for_cameras(inputs.len());
        let (filter_graph, width, height) = self.filter_graph(plan, &inputs, &layout);

        let audio_input = if self.options.include_audio {
            plan.cameras.iter().position(|c| c.camera.is_primary())
        } else {
            None
        };

        debug!(
            inputs = inputs.len(),
            width,
            height,
            encoder = self.encoder.codec_name(),
            graph = %filter_graph,
            "Built export command"
        );

        Ok(CommandSpec {
            inputs,
            filter_graph,
            audio_input,
            encoder: self.encoder,
            encoder_args: self.encoder.args(self.options.quality),
            output: self.options.output.clone(),
            duration: plan.duration(),
            width,
            height,
        })
    }

    /// Single file: seek straight into it. Several files: concatenate and
    /// trim only the outer edges.
    fn input_for(camera_plan: &CameraPlan) -> InputSpec {
        let camera = camera_plan.camera;
        let source = if camera_plan.needs_concat() {
            InputSource::Concat(camera_plan.paths())
        } else {
            let path = camera_plan
                .slices
                .first()
                .map(|s| s.path.clone())
                .unwrap_or_default();
            InputSource::File(path)
        };

        let (seek, duration) = Self::input_window(camera_plan);
        InputSpec {
            camera,
            source,
            seek,
            duration,
        }
    }

    /// Seek and length read from the input stream. The camera's sync offset
    /// shifts the window; near the end of the stream the window is cut short,
    /// and when the shift would leave nothing to read it is pulled back so
    /// the seek stays inside the stream.
    fn input_window(camera_plan: &CameraPlan) -> (f64, f64) {
        let trim_in = camera_plan.trim_in();
        let duration = camera_plan.duration();
        let stream_end = camera_plan.stream_duration();
        let wanted = trim_in + camera_plan.camera.sync_offset_secs();

        if wanted + duration <= stream_end {
            (wanted, duration)
        } else if stream_end - wanted >= MIN_INPUT_SECS {
            (wanted, stream_end - wanted)
        } else {
            debug!(
                camera = %camera_plan.camera,
                wanted,
                stream_end,
                "Sync offset would seek past the end of the input, pulling it back"
            );
            ((stream_end - duration).max(trim_in), duration)
        }
    }

    fn filter_graph(&self, plan: &ExportPlan, inputs: &[InputSpec], layout: &GridLayout) -> (String, u32, u32) {
        let mut chains = Vec::with_capacity(inputs.len() + 2);

        for (index, input) in inputs.iter().enumerate() {
            let mut filters = vec!["setpts=PTS-STARTPTS".to_string()];
            if input.camera.is_mirrored() {
                filters.push("hflip".to_string());
            }
            filters.push(format!("scale={}:{}", layout.cell_width, layout.cell_height));
            chains.push(format!("[{}:v]{}[c{}]", index, filters.join(","), index));
        }

        let composite = if inputs.len() == 1 {
            "c0".to_string()
        } else {
            let sources: String = (0..inputs.len()).map(|i| format!("[c{}]", i)).collect();
            chains.push(format!(
                "{}xstack=inputs={}:layout={}:fill=black[grid]",
                sources,
                inputs.len(),
                layout.xstack_layout()
            ));
            "grid".to_string()
        };

        let mut post = Vec::new();
        if let Some(overlay) = &self.options.timestamp {
            post.extend(overlay.filters(&plan.runs));
        }
        let (width, height) = match self.options.quality {
            QualityTier::Full => (layout.width(), layout.height()),
            QualityTier::Mobile => {
                let (width, height) = layout.mobile_dimensions();
                post.push(format!("scale={}:{}", width, height));
                (width, height)
            }
        };
        post.push("format=yuv420p".to_string());

        chains.push(format!("[{}]{}[{}]", composite, post.join(","), VIDEO_OUTPUT_LABEL));
        (chains.join(";"), width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::ClipSlice;

    #[test]
    fn test_concat_list_escapes_quotes() {
        let contents = concat_list_contents(&[
            PathBuf::from("/clips/a.mp4"),
            PathBuf::from("/clips/bob's.mp4"),
        ]);
        assert_eq!(contents, "file '/clips/a.mp4'\nfile '/clips/bob'\\''s.mp4'\n");
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("-c:v"), "-c:v");
        assert_eq!(shell_quote("[0:v]scale=1:2[c0]"), "'[0:v]scale=1:2[c0]'");
    }

    #[test]
    fn test_back_camera_single_file_gets_sync_offset() {
        let plan = CameraPlan {
            camera: CameraId::Back,
            slices: vec![ClipSlice {
                clip_index: 4,
                path: PathBuf::from("/clips/back.mp4"),
                trim_in: 12.0,
                trim_out: 40.0,
                file_duration: 60.0,
            }],
        };
        let input = CommandBuilder::input_for(&plan);
        assert_eq!(input.source, InputSource::File(PathBuf::from("/clips/back.mp4")));
        assert_eq!(input.seek, 13.0);
        assert_eq!(input.duration, 28.0);
    }

    fn back_slice(trim_in: f64, trim_out: f64) -> CameraPlan {
        CameraPlan {
            camera: CameraId::Back,
            slices: vec![ClipSlice {
                clip_index: 0,
                path: PathBuf::from("/clips/back.mp4"),
                trim_in,
                trim_out,
                file_duration: 60.0,
            }],
        }
    }

    #[test]
    fn test_sync_offset_never_seeks_past_the_file() {
        // Shifted by a second this would start at 60.5 of a 60s file
        let input = CommandBuilder::input_for(&back_slice(59.5, 60.0));
        assert_eq!(input.seek, 59.5);
        assert_eq!(input.duration, 0.5);
        assert!(input.seek < 60.0);

        let input = CommandBuilder::input_for(&back_slice(59.0, 60.0));
        assert_eq!(input.seek, 59.0);
    }

    #[test]
    fn test_sync_offset_kept_when_the_file_ends_early() {
        let input = CommandBuilder::input_for(&back_slice(30.0, 60.0));
        assert_eq!(input.seek, 31.0);
        assert_eq!(input.duration, 29.0);
    }

    #[test]
    fn test_front_camera_reads_the_slice_unchanged() {
        let mut plan = back_slice(30.0, 60.0);
        plan.camera = CameraId::Front;
        let input = CommandBuilder::input_for(&plan);
        assert_eq!((input.seek, input.duration), (30.0, 30.0));
    }
}
