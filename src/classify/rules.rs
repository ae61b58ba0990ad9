use serde::{Deserialize, Serialize};

use crate::classify::pixel::PixelStats;
use crate::classify::sample::ColorSample;
use crate::error::{CompositorError, Result};
use crate::frame::{Frame, Mask, RegionSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    pub fn index(self) -> usize {
        match self {
            Channel::Red => 0,
            Channel::Green => 1,
            Channel::Blue => 2,
        }
    }
}

/// A single named color predicate
///
/// Channel thresholds are on the 0..=255 scale, saturation and value on
/// 0..=1, distances are Euclidean RGB distances to the reference sample.
/// All comparisons are strict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ColorRule {
    /// Saturated, reasonably bright and away from the reference
    ColoredFill {
        min_saturation: f32,
        min_value: f32,
        min_distance: f32,
    },
    /// Dark and away from the reference
    DarkOutline { max_value: f32, min_distance: f32 },
    /// `channel > over + margin`, optionally also away from the reference
    ChannelDominance {
        channel: Channel,
        over: Channel,
        margin: f32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_distance: Option<f32>,
    },
    /// `channel - over < below`
    ChannelGap {
        channel: Channel,
        over: Channel,
        below: f32,
    },
    /// `lower[c] < rgb[c] < upper[c]` for every channel
    ChannelBounds {
        #[serde(default = "open_lower")]
        lower: [f32; 3],
        #[serde(default = "open_upper")]
        upper: [f32; 3],
    },
    DistanceAbove { min_distance: f32 },
    BrightnessBelow { max_brightness: f32 },
    /// Darker than the reference's mean brightness by more than `margin`
    DarkerThanReference { margin: f32 },
    All { rules: Vec<ColorRule> },
    Any { rules: Vec<ColorRule> },
    /// Written as `rule = "not"` with the negated rule under `of`
    Not {
        #[serde(rename = "of")]
        rule: Box<ColorRule>,
    },
}

fn open_lower() -> [f32; 3] {
    [-1.0; 3]
}

fn open_upper() -> [f32; 3] {
    [256.0; 3]
}

impl ColorRule {
    /// Every channel strictly above `lower`
    pub fn channels_above(lower: [f32; 3]) -> Self {
        ColorRule::ChannelBounds {
            lower,
            upper: open_upper(),
        }
    }

    /// Every channel strictly below `upper`
    pub fn channels_below(upper: [f32; 3]) -> Self {
        ColorRule::ChannelBounds {
            lower: open_lower(),
            upper,
        }
    }

    pub fn matches(&self, px: &PixelStats, reference: &ColorSample) -> bool {
        match self {
            ColorRule::ColoredFill {
                min_saturation,
                min_value,
                min_distance,
            } => px.saturation > *min_saturation && px.value > *min_value && px.distance > *min_distance,
            ColorRule::DarkOutline { max_value, min_distance } => {
                px.value < *max_value && px.distance > *min_distance
            }
            ColorRule::ChannelDominance {
                channel,
                over,
                margin,
                min_distance,
            } => {
                px.rgb[channel.index()] > px.rgb[over.index()] + margin
                    && min_distance.map_or(true, |d| px.distance > d)
            }
            ColorRule::ChannelGap { channel, over, below } => {
                px.rgb[channel.index()] - px.rgb[over.index()] < *below
            }
            ColorRule::ChannelBounds { lower, upper } => {
                (0..3).all(|c| px.rgb[c] > lower[c] && px.rgb[c] < upper[c])
            }
            ColorRule::DistanceAbove { min_distance } => px.distance > *min_distance,
            ColorRule::BrightnessBelow { max_brightness } => px.brightness < *max_brightness,
            ColorRule::DarkerThanReference { margin } => px.brightness < reference.brightness() - margin,
            ColorRule::All { rules } => rules.iter().all(|r| r.matches(px, reference)),
            ColorRule::Any { rules } => rules.iter().any(|r| r.matches(px, reference)),
            ColorRule::Not { rule } => !rule.matches(px, reference),
        }
    }

    pub(crate) fn validate(&self, key: &str) -> Result<()> {
        let check = |name: &str, value: f32, ok: bool| -> Result<()> {
            if value.is_finite() && ok {
                Ok(())
            } else {
                Err(CompositorError::invalid_value(format!("{}.{}", key, name), value))
            }
        };

        match self {
            ColorRule::ColoredFill {
                min_saturation,
                min_value,
                min_distance,
            } => {
                check("min_saturation", *min_saturation, (0.0..=1.0).contains(min_saturation))?;
                check("min_value", *min_value, (0.0..=1.0).contains(min_value))?;
                check("min_distance", *min_distance, *min_distance >= 0.0)
            }
            ColorRule::DarkOutline { max_value, min_distance } => {
                check("max_value", *max_value, (0.0..=1.0).contains(max_value))?;
                check("min_distance", *min_distance, *min_distance >= 0.0)
            }
            ColorRule::ChannelDominance {
                margin, min_distance, ..
            } => {
                check("margin", *margin, true)?;
                match min_distance {
                    Some(d) => check("min_distance", *d, *d >= 0.0),
                    None => Ok(()),
                }
            }
            ColorRule::ChannelGap { below, .. } => check("below", *below, true),
            ColorRule::ChannelBounds { lower, upper } => {
                for c in 0..3 {
                    check("lower", lower[c], true)?;
                    check("upper", upper[c], lower[c] < upper[c])?;
                }
                Ok(())
            }
            ColorRule::DistanceAbove { min_distance } => {
                check("min_distance", *min_distance, *min_distance >= 0.0)
            }
            ColorRule::BrightnessBelow { max_brightness } => {
                check("max_brightness", *max_brightness, *max_brightness >= 0.0)
            }
            ColorRule::DarkerThanReference { margin } => check("margin", *margin, *margin >= 0.0),
            ColorRule::All { rules } | ColorRule::Any { rules } => {
                if rules.is_empty() {
                    return Err(CompositorError::invalid_value(format!("{}.rules", key), "[]"));
                }
                for (i, rule) in rules.iter().enumerate() {
                    rule.validate(&format!("{}.rules[{}]", key, i))?;
                }
                Ok(())
            }
            ColorRule::Not { rule } => rule.validate(&format!("{}.of", key)),
        }
    }
}

/// A union of color rules: a pixel is selected when any rule matches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub rules: Vec<ColorRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<ColorRule>) -> Self {
        Self { rules }
    }

    pub fn matches(&self, px: &PixelStats, reference: &ColorSample) -> bool {
        self.rules.iter().any(|r| r.matches(px, reference))
    }

    pub fn validate(&self, key: &str) -> Result<()> {
        if self.rules.is_empty() {
            return Err(CompositorError::invalid_value(format!("{}.rules", key), "[]"));
        }
        for (i, rule) in self.rules.iter().enumerate() {
            rule.validate(&format!("{}.rules[{}]", key, i))?;
        }
        Ok(())
    }
}

/// Turns a rule set into a mask over a frame
///
/// Pixels outside the classifier's region are never selected.
#[derive(Debug, Clone)]
pub struct ColorClassifier {
    rules: RuleSet,
    region: RegionSpec,
}

impl ColorClassifier {
    /// Build a classifier, rejecting out-of-range thresholds
    pub fn new(rules: RuleSet) -> Result<Self> {
        rules.validate("classifier")?;
        Ok(Self {
            rules,
            region: RegionSpec::FULL,
        })
    }

    pub fn within(mut self, region: RegionSpec) -> Result<Self> {
        region.validate("classifier")?;
        self.region = region;
        Ok(self)
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn classify(&self, frame: &Frame, reference: &ColorSample) -> Mask {
        let (w, h) = frame.dimensions();
        let rect = self.region.resolve(w, h);
        Mask::from_fn(w, h, |x, y| {
            rect.contains(x, y) && self.rules.matches(&PixelStats::measure(frame.rgb_f32(x, y), reference), reference)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Channels;

    fn stats(rgb: [f32; 3], reference: &ColorSample) -> PixelStats {
        PixelStats::measure(rgb, reference)
    }

    #[test]
    fn test_colored_fill_and_outline() {
        let bg = ColorSample::new([230.0, 220.0, 200.0]);
        let fill = ColorRule::ColoredFill {
            min_saturation: 0.12,
            min_value: 0.25,
            min_distance: 25.0,
        };
        let outline = ColorRule::DarkOutline {
            max_value: 0.45,
            min_distance: 35.0,
        };

        assert!(fill.matches(&stats([220.0, 40.0, 60.0], &bg), &bg));
        assert!(!fill.matches(&stats([230.0, 220.0, 200.0], &bg), &bg));
        assert!(outline.matches(&stats([30.0, 20.0, 25.0], &bg), &bg));
        assert!(!outline.matches(&stats([220.0, 40.0, 60.0], &bg), &bg));
    }

    #[test]
    fn test_channel_predicates() {
        let r = ColorSample::BLACK;
        let dominance = ColorRule::ChannelDominance {
            channel: Channel::Red,
            over: Channel::Green,
            margin: 15.0,
            min_distance: None,
        };
        assert!(dominance.matches(&stats([120.0, 100.0, 0.0], &r), &r));
        assert!(!dominance.matches(&stats([115.0, 100.0, 0.0], &r), &r));

        let gap = ColorRule::ChannelGap {
            channel: Channel::Green,
            over: Channel::Blue,
            below: 30.0,
        };
        assert!(gap.matches(&stats([0.0, 229.0, 200.0], &r), &r));
        assert!(!gap.matches(&stats([0.0, 230.0, 200.0], &r), &r));

        let bright = ColorRule::channels_above([200.0, 200.0, 200.0]);
        assert!(bright.matches(&stats([201.0, 255.0, 230.0], &r), &r));
        assert!(!bright.matches(&stats([200.0, 255.0, 230.0], &r), &r));
    }

    #[test]
    fn test_combinators() {
        let r = ColorSample::new([100.0, 100.0, 100.0]);
        let rule = ColorRule::All {
            rules: vec![
                ColorRule::DarkerThanReference { margin: 15.0 },
                ColorRule::Not {
                    rule: Box::new(ColorRule::BrightnessBelow { max_brightness: 50.0 }),
                },
            ],
        };
        assert!(rule.matches(&stats([60.0, 60.0, 60.0], &r), &r));
        assert!(!rule.matches(&stats([40.0, 40.0, 40.0], &r), &r));
        assert!(!rule.matches(&stats([90.0, 90.0, 90.0], &r), &r));
    }

    #[test]
    fn test_uniform_frame_yields_empty_mask() {
        let frame = Frame::new_filled(16, 8, [180, 40, 200]);
        let reference = ColorSample::from_corners(&frame, 4, &[crate::classify::Corner::TopLeft]).unwrap();
        let classifier = ColorClassifier::new(RuleSet::new(vec![
            ColorRule::ColoredFill {
                min_saturation: 0.12,
                min_value: 0.25,
                min_distance: 25.0,
            },
            ColorRule::DistanceAbove { min_distance: 0.5 },
        ]))
        .unwrap();

        let mask = classifier.classify(&frame, &reference);
        assert_eq!(mask.dimensions(), frame.dimensions());
        assert!(mask.is_clear());
    }

    #[test]
    fn test_region_restricts_classification() {
        let frame = Frame::new_filled(10, 10, [255, 255, 255]);
        let classifier = ColorClassifier::new(RuleSet::new(vec![ColorRule::channels_above([200.0; 3])]))
            .unwrap()
            .within(RegionSpec::band(0.0, 0.5))
            .unwrap();

        let mask = classifier.classify(&frame, &ColorSample::BLACK);
        assert_eq!(mask.count(), 50);
        assert!(mask.get(3, 4));
        assert!(!mask.get(3, 5));
    }

    #[test]
    fn test_out_of_range_thresholds_fail() {
        let bad = RuleSet::new(vec![ColorRule::ColoredFill {
            min_saturation: 1.5,
            min_value: 0.25,
            min_distance: 25.0,
        }]);
        assert!(ColorClassifier::new(bad).is_err());

        let negative = RuleSet::new(vec![ColorRule::DistanceAbove { min_distance: -1.0 }]);
        assert!(ColorClassifier::new(negative).is_err());

        assert!(ColorClassifier::new(RuleSet::new(vec![])).is_err());
        assert!(ColorClassifier::new(RuleSet::new(vec![ColorRule::Any { rules: vec![] }])).is_err());
    }

    #[test]
    fn test_rules_parse_from_toml() {
        let text = r#"
            [[rules]]
            rule = "channel_dominance"
            channel = "blue"
            over = "green"
            margin = 15
            min_distance = 20

            [[rules]]
            rule = "channel_bounds"
            upper = [80, 60, 60]
        "#;
        let set: RuleSet = toml::from_str(text).unwrap();
        assert_eq!(set.rules.len(), 2);
        assert_eq!(set.rules[1], ColorRule::channels_below([80.0, 60.0, 60.0]));

        let frame = Frame::from_fn(2, 1, Channels::Rgb, |x, _| if x == 0 { [10, 10, 10, 255] } else { [90, 90, 90, 255] });
        let mask = ColorClassifier::new(set).unwrap().classify(&frame, &ColorSample::BLACK);
        assert!(mask.get(0, 0));
        assert!(!mask.get(1, 0));
    }

    #[test]
    fn test_nested_combinators_parse_from_toml() {
        let text = r#"
            [[rules]]
            rule = "all"

            [[rules.rules]]
            rule = "brightness_below"
            max_brightness = 100

            [[rules.rules]]
            rule = "not"
            of = { rule = "any", rules = [{ rule = "channel_dominance", channel = "red", over = "green", margin = 15 }, { rule = "channel_bounds", upper = [20, 256, 256] }] }
        "#;
        let set: RuleSet = toml::from_str(text).unwrap();
        assert!(matches!(&set.rules[0], ColorRule::All { rules } if matches!(rules[1], ColorRule::Not { .. })));

        let colors = [[60, 60, 60], [90, 40, 40], [10, 50, 50], [200, 200, 200]];
        let frame = Frame::from_fn(4, 1, Channels::Rgb, |x, _| {
            let [r, g, b] = colors[x as usize];
            [r, g, b, 255]
        });
        let mask = ColorClassifier::new(set.clone()).unwrap().classify(&frame, &ColorSample::BLACK);
        assert!(mask.get(0, 0));
        assert!(!mask.get(1, 0));
        assert!(!mask.get(2, 0));
        assert!(!mask.get(3, 0));

        // Written back out, the negated rule keeps its own key
        let written = toml::to_string(&set).unwrap();
        assert!(written.contains("of"));
        assert_eq!(toml::from_str::<RuleSet>(&written).unwrap(), set);
    }

    #[test]
    fn test_nested_rule_errors_name_their_path() {
        let rule = ColorRule::Not {
            rule: Box::new(ColorRule::BrightnessBelow { max_brightness: -1.0 }),
        };
        let err = rule.validate("retouch.title.text").unwrap_err();
        assert!(err.to_string().contains("retouch.title.text.of.max_brightness"));
    }
}
