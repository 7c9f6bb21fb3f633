//! Lowering of filters, overlays, subtitles and speed into one video filter graph
//!
//! Values pass through two escaping levels: the filter option parser
//! (`\ ' :`) and then the graph parser (`\ ' [ ] , ;`).

use std::path::Path;

use crate::domain::model::{
    FilterOp, Job, Overlay, OverlayKind, SubtitleMode, SubtitleSource, SubtitleSpec,
};

/// Escape a value for the filter option parser
pub fn escape_option_value(value: &str) -> String {
    escape_chars(value, &['\\', '\'', ':'])
}

/// Escape a filter description for the graph parser
pub fn escape_graph_text(value: &str) -> String {
    escape_chars(value, &['\\', '\'', '[', ']', ',', ';'])
}

fn escape_chars(value: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Both escaping levels, for a value embedded in a graph
fn quote(value: &str) -> String {
    escape_graph_text(&escape_option_value(value))
}

fn quote_path(path: &Path) -> String {
    quote(&path.to_string_lossy())
}

/// Render `name=k=v:k=v` with every value escaped
pub fn render_filter(op: &FilterOp) -> String {
    if op.params.is_empty() {
        return op.name.clone();
    }
    let params: Vec<String> = op
        .params
        .iter()
        .map(|(key, value)| {
            if key.is_empty() {
                quote(value)
            } else {
                format!("{}={}", key, quote(value))
            }
        })
        .collect();
    format!("{}={}", op.name, params.join(":"))
}

fn seconds(millis: u64) -> String {
    format!("{}.{:03}", millis / 1000, millis % 1000)
}

fn enable_expr(overlay: &Overlay) -> Option<String> {
    overlay.window.map(|w| {
        quote(&format!(
            "between(t,{},{})",
            seconds(w.start.as_millis()),
            seconds(w.end.as_millis())
        ))
    })
}

fn drawtext(overlay: &Overlay) -> Option<String> {
    let OverlayKind::Text {
        text,
        font_size,
        font_color,
        font_file,
    } = &overlay.kind
    else {
        return None;
    };

    let mut params = vec![
        format!("text={}", quote(text)),
        "expansion=none".to_string(),
        format!("x={}", overlay.x),
        format!("y={}", overlay.y),
        format!("fontsize={}", font_size),
        format!("fontcolor={}", quote(&format!("{}@{}", font_color, overlay.opacity))),
    ];
    if let Some(font) = font_file {
        params.push(format!("fontfile={}", quote_path(font)));
    }
    if let Some(enable) = enable_expr(overlay) {
        params.push(format!("enable={}", enable));
    }
    Some(format!("drawtext={}", params.join(":")))
}

fn subtitle_burn(spec: &SubtitleSpec, job: &Job) -> Vec<String> {
    let mut params = match spec.source() {
        SubtitleSource::File(path) => vec![format!("filename={}", quote_path(path))],
        SubtitleSource::Embedded(index) => vec![
            format!("filename={}", quote_path(job.input())),
            format!("si={}", index),
        ],
    };
    if let Some(style) = spec.style() {
        if let Some(charset) = &style.charset {
            params.push(format!("charenc={}", quote(charset)));
        }
        let mut force = Vec::new();
        if let Some(size) = style.font_size {
            force.push(format!("FontSize={}", size));
        }
        if let Some(colour) = &style.primary_colour {
            force.push(format!("PrimaryColour={}", colour));
        }
        if !force.is_empty() {
            params.push(format!("force_style={}", quote(&force.join(","))));
        }
    }

    // Input seeking restarts timestamps at zero; shift back so the subtitle
    // renderer sees source time, then restore clip time.
    let start = seconds(job.start().as_millis());
    vec![
        format!("setpts=PTS+{}/TB", start),
        format!("subtitles={}", params.join(":")),
        "setpts=PTS-STARTPTS".to_string(),
    ]
}

enum Stage<'a> {
    Linear(String),
    Image(&'a Overlay, &'a Path),
}

fn stages(job: &Job) -> Vec<Stage<'_>> {
    let mut stages: Vec<Stage<'_>> = job
        .filters()
        .iter()
        .map(|op| Stage::Linear(render_filter(op)))
        .collect();

    if let Some(spec) = job.subtitles() {
        if spec.mode() == SubtitleMode::BurnIn {
            stages.extend(subtitle_burn(spec, job).into_iter().map(Stage::Linear));
        }
    }

    for overlay in job.overlays() {
        match &overlay.kind {
            OverlayKind::Image { path } => stages.push(Stage::Image(overlay, path)),
            OverlayKind::Text { .. } => {
                if let Some(filter) = drawtext(overlay) {
                    stages.push(Stage::Linear(filter));
                }
            }
        }
    }

    if job.speed() != 1.0 {
        stages.push(Stage::Linear(format!("setpts=PTS/{}", job.speed())));
    }
    stages
}

/// Complete `-vf` graph for a job, or `None` when nothing applies
pub fn build_video_graph(job: &Job) -> Option<String> {
    let stages = stages(job);
    if stages.is_empty() {
        return None;
    }

    if !stages.iter().any(|s| matches!(s, Stage::Image(..))) {
        let chain: Vec<String> = stages
            .into_iter()
            .filter_map(|s| match s {
                Stage::Linear(f) => Some(f),
                Stage::Image(..) => None,
            })
            .collect();
        return Some(chain.join(","));
    }

    Some(labeled_graph(stages))
}

/// `[in] … [out]` graph with image sources read through `movie=`
fn labeled_graph(stages: Vec<Stage<'_>>) -> String {
    let mut segments: Vec<(String, String)> = Vec::new();
    let mut pending: Vec<String> = Vec::new();
    let mut current = "in".to_string();
    let mut next_label = 0usize;
    let mut image_index = 0usize;

    let mut fresh = |prefix: &str| {
        let label = format!("{}{}", prefix, next_label);
        next_label += 1;
        label
    };

    for stage in stages {
        match stage {
            Stage::Linear(filter) => pending.push(filter),
            Stage::Image(overlay, path) => {
                if !pending.is_empty() {
                    let label = fresh("v");
                    segments.push((format!("[{}]{}", current, pending.join(",")), label.clone()));
                    pending.clear();
                    current = label;
                }

                let source = format!("ov{}", image_index);
                image_index += 1;
                let mut chain = vec![
                    format!("movie=filename={}", quote_path(path)),
                    "format=rgba".to_string(),
                ];
                if overlay.opacity < 1.0 {
                    chain.push(format!("colorchannelmixer=aa={}", overlay.opacity));
                }
                segments.push((chain.join(","), source.clone()));

                let mut params = vec![format!("x={}", overlay.x), format!("y={}", overlay.y)];
                if let Some(enable) = enable_expr(overlay) {
                    params.push(format!("enable={}", enable));
                }
                let label = fresh("v");
                segments.push((
                    format!("[{}][{}]overlay={}", current, source, params.join(":")),
                    label.clone(),
                ));
                current = label;
            }
        }
    }

    if pending.is_empty() {
        if let Some(last) = segments.last_mut() {
            last.1 = "out".to_string();
        }
    } else {
        segments.push((format!("[{}]{}", current, pending.join(",")), "out".to_string()));
    }

    segments
        .into_iter()
        .map(|(body, label)| format!("{}[{}]", body, label))
        .collect::<Vec<_>>()
        .join(";")
}

/// `atempo` chain for a speed factor; each stage stays within [0.5, 2.0]
pub fn atempo_chain(speed: f64) -> Option<String> {
    if speed == 1.0 {
        return None;
    }
    let mut remaining = speed;
    let mut stages = Vec::new();
    while remaining > 2.0 {
        stages.push("atempo=2.0".to_string());
        remaining /= 2.0;
    }
    while remaining < 0.5 {
        stages.push("atempo=0.5".to_string());
        remaining /= 0.5;
    }
    stages.push(format!("atempo={}", remaining));
    Some(stages.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Job, Overlay, SubtitleStyle};
    use crate::domain::timecode::Timecode;

    fn tc(text: &str) -> Timecode {
        Timecode::parse(text).unwrap()
    }

    fn job() -> crate::domain::model::JobBuilder {
        Job::builder("a.mp4", "out.mp4", tc("00:00:10.000"), tc("00:00:20.000"))
    }

    #[test]
    fn test_escaping_levels() {
        assert_eq!(escape_option_value("a:b'c\\d"), "a\\:b\\'c\\\\d");
        assert_eq!(escape_graph_text("x[1],y;z"), "x\\[1\\]\\,y\\;z");
        assert_eq!(quote("12:30"), "12\\\\:30");
    }

    #[test]
    fn test_render_filter() {
        assert_eq!(render_filter(&FilterOp::scale(1280, -2)), "scale=w=1280:h=-2");
        assert_eq!(render_filter(&FilterOp::new("hflip")), "hflip");
        assert_eq!(
            render_filter(&FilterOp::parse("scale=640:360").unwrap()),
            "scale=640:360"
        );
    }

    #[test]
    fn test_empty_job_has_no_graph() {
        assert_eq!(build_video_graph(&job().build().unwrap()), None);
    }

    #[test]
    fn test_linear_chain_order() {
        let job = job()
            .filter(FilterOp::crop(640, 360, 0, 0))
            .filter(FilterOp::scale(1280, 720))
            .overlay(Overlay::text("Hi", 10, 20).with_window(tc("00:00:01.000"), tc("00:00:02.500")))
            .speed(2.0)
            .build()
            .unwrap();
        assert_eq!(
            build_video_graph(&job).unwrap(),
            "crop=w=640:h=360:x=0:y=0,scale=w=1280:h=720,\
             drawtext=text=Hi:expansion=none:x=10:y=20:fontsize=24:fontcolor=white@1:\
             enable=between(t\\,1.000\\,2.500),setpts=PTS/2"
        );
    }

    #[test]
    fn test_subtitle_burn_is_time_shifted() {
        let style = SubtitleStyle {
            font_size: Some(28),
            primary_colour: Some("&H00FFFF00".to_string()),
            charset: Some("cp1251".to_string()),
        };
        let job = job()
            .subtitles(SubtitleSpec::burn_in(SubtitleSource::File("subs.srt".into()), Some(style)))
            .build()
            .unwrap();
        assert_eq!(
            build_video_graph(&job).unwrap(),
            "setpts=PTS+10.000/TB,\
             subtitles=filename=subs.srt:charenc=cp1251:force_style=FontSize=28\\,PrimaryColour=&H00FFFF00,\
             setpts=PTS-STARTPTS"
        );
    }

    #[test]
    fn test_embedded_burn_uses_input() {
        let job = job()
            .subtitles(SubtitleSpec::burn_in(SubtitleSource::Embedded(1), None))
            .build()
            .unwrap();
        let graph = build_video_graph(&job).unwrap();
        assert!(graph.contains("subtitles=filename=a.mp4:si=1"));
    }

    #[test]
    fn test_passthrough_adds_nothing_to_graph() {
        let job = job()
            .subtitles(SubtitleSpec::passthrough(SubtitleSource::Embedded(0)))
            .build()
            .unwrap();
        assert_eq!(build_video_graph(&job), None);
    }

    #[test]
    fn test_image_overlay_labeled_graph() {
        let job = job()
            .filter(FilterOp::scale(1280, 720))
            .overlay(Overlay::image("logo.png", 5, 5).with_opacity(0.5))
            .speed(1.5)
            .build()
            .unwrap();
        assert_eq!(
            build_video_graph(&job).unwrap(),
            "[in]scale=w=1280:h=720[v0];\
             movie=filename=logo.png,format=rgba,colorchannelmixer=aa=0.5[ov0];\
             [v0][ov0]overlay=x=5:y=5[v1];\
             [v1]setpts=PTS/1.5[out]"
        );
    }

    #[test]
    fn test_image_overlay_last_stage_outputs_out() {
        let job = job()
            .overlay(Overlay::image("a.png", 0, 0))
            .overlay(Overlay::image("b.png", 10, 10).with_window(tc("00:00:00.000"), tc("00:00:05.000")))
            .build()
            .unwrap();
        assert_eq!(
            build_video_graph(&job).unwrap(),
            "movie=filename=a.png,format=rgba[ov0];\
             [in][ov0]overlay=x=0:y=0[v0];\
             movie=filename=b.png,format=rgba[ov1];\
             [v0][ov1]overlay=x=10:y=10:enable=between(t\\,0.000\\,5.000)[out]"
        );
    }

    #[test]
    fn test_text_with_metacharacters_is_escaped() {
        let job = job().overlay(Overlay::text("it's 10:30, [live]; $HOME", 0, 0)).build().unwrap();
        let graph = build_video_graph(&job).unwrap();
        assert!(graph.starts_with(
            "drawtext=text=it\\\\\\'s 10\\\\:30\\, \\[live\\]\\; $HOME:expansion=none"
        ));
    }

    #[test]
    fn test_atempo_chain() {
        assert_eq!(atempo_chain(1.0), None);
        assert_eq!(atempo_chain(1.5).unwrap(), "atempo=1.5");
        assert_eq!(atempo_chain(3.0).unwrap(), "atempo=2.0,atempo=1.5");
        assert_eq!(atempo_chain(0.5).unwrap(), "atempo=0.5");
    }
}
