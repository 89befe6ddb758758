// Per-path dataset builder - turns decoded samples into transition points
use crate::domain::dataset::{Dataset, PALETTE_LEN, PlotPoint, PointStyle, TooltipRecord};
use crate::domain::panel::{PathDescriptor, TimestampMethod};
use crate::domain::sample::{SampleValue, SeriesSample};
use crate::domain::time::Time;

#[derive(Debug, Clone, PartialEq)]
pub struct BuiltDataset {
    pub dataset: Dataset,
    pub tooltips: Vec<TooltipRecord>,
}

/// Build the transition points for one path.
///
/// `blocks` are walked in order as a single concatenated sequence, so a value
/// that continues across a block boundary does not produce a new point. One point
/// is emitted for the first sample and one for every change of normalized value.
pub fn build_dataset<'a, I>(
    path: &PathDescriptor,
    start_time: Time,
    dataset_index: usize,
    blocks: I,
) -> BuiltDataset
where
    I: IntoIterator<Item = &'a [SeriesSample]>,
{
    let y = path.offset();
    let mut points = Vec::new();
    let mut tooltips = Vec::new();
    let mut previous: Option<&SampleValue> = None;
    let mut last_x = f64::NEG_INFINITY;
    let mut out_of_order = 0usize;

    for sample in blocks.into_iter().flatten() {
        let Some(timestamp) = sample_time(sample, path.timestamp_method) else {
            continue;
        };

        let x = timestamp.seconds_since(start_time);
        if x < last_x {
            out_of_order += 1;
        }
        last_x = x;

        if previous == Some(&sample.value) {
            continue;
        }
        previous = Some(&sample.value);

        let label = sample.value.to_string();
        points.push(PlotPoint {
            x,
            y,
            label: label.clone(),
            style: style_for(&sample.value),
        });
        tooltips.push(TooltipRecord {
            x,
            y,
            dataset_index,
            path: path.query.clone(),
            value: label,
            raw_value: sample.raw_value.clone(),
        });
    }

    if out_of_order > 0 {
        tracing::debug!(
            "{} out-of-order samples on path {}",
            out_of_order,
            path.query
        );
    }

    BuiltDataset {
        dataset: Dataset {
            path_index: path.vertical_slot,
            label: path.display_label.clone(),
            points,
        },
        tooltips,
    }
}

fn sample_time(sample: &SeriesSample, method: TimestampMethod) -> Option<Time> {
    match method {
        TimestampMethod::ReceiveTime => Some(sample.receive_time),
        TimestampMethod::HeaderStamp => sample.header_stamp,
    }
}

fn style_for(value: &SampleValue) -> PointStyle {
    let palette = PALETTE_LEN as i64;
    let color_index = match value {
        SampleValue::Bool(b) => *b as usize,
        SampleValue::Integer(i) => i.rem_euclid(palette) as usize,
        SampleValue::Unsigned(u) => (u % PALETTE_LEN as u64) as usize,
        SampleValue::Float(v) if v.is_finite() => (v.round() as i64).rem_euclid(palette) as usize,
        SampleValue::Float(_) => 0,
        SampleValue::Text(s) | SampleValue::Json(s) => (fnv1a(s.as_bytes()) % PALETTE_LEN as u64) as usize,
    };
    PointStyle { color_index }
}

/// Stable across runs, unlike `DefaultHasher`.
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ *b as u64).wrapping_mul(0x0100_0000_01b3)
    })
}
