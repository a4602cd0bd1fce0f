//! Template matching engine
//!
//! Computes normalized similarity surfaces between a template and every
//! valid placement inside a source frame (or a region of it). Window sums
//! come from integral images; the cross term is a tight loop over the raw
//! pixel rows. All surface arithmetic runs in f64 so confidences are
//! bit-stable across repeated calls.

use std::cmp::Ordering;
use std::time::Instant;

use image::{GrayImage, imageops};

use super::config::MatchOptions;
use super::template::Template;
use super::types::{CancelToken, MatchResult, MultiScaleResult};
use crate::error::{VisionError, VisionResult};
use crate::frame::{Frame, Rect};

/// Rows scanned between cancellation checks.
const CANCEL_CHECK_ROWS: u32 = 16;
/// Treat normalization denominators below this as degenerate.
const DENOM_EPSILON: f64 = 1e-9;
/// Slack on the inclusive upper scale bound.
const SCALE_EPSILON: f32 = 1e-4;

/// Template matcher over owned frames.
///
/// Stateless apart from its options; one matcher can serve any number of
/// frames and templates, and borrows both only for the duration of a call.
pub struct Matcher {
    options: MatchOptions,
    cancel: Option<CancelToken>,
}

impl Matcher {
    pub fn new(options: MatchOptions) -> Self {
        Self {
            options,
            cancel: None,
        }
    }

    /// Attach a cancellation token checked between scan rows and scales.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    /// Locate the single best placement of `template` inside `source`.
    ///
    /// Fails fast with [`VisionError::InvalidTemplateSize`] when the template
    /// is not strictly smaller than the source, and with
    /// [`VisionError::InvalidOptions`] for malformed thresholds. Runtime
    /// failures inside the search are logged and reported as a non-match so
    /// a control loop polling frames stays alive.
    pub fn match_single(&self, source: &Frame, template: &Template) -> VisionResult<MatchResult> {
        let start = Instant::now();
        self.options.validate()?;
        validate_strictly_smaller(source, template)?;

        let area = match SearchArea::prepare(source, self.options.roi) {
            Ok(area) => area,
            Err(err) => {
                log::warn!(
                    "match for template '{}' failed, reporting no match: {err}",
                    template.id()
                );
                return Ok(MatchResult::not_found(self.options.method, ms_since(start)));
            }
        };

        let threshold = f64::from(self.options.threshold);
        let scan = self.scan(&area, template.gray(), threshold, false);
        let result = self.best_to_result(&area, scan.best, template.gray(), 1.0, ms_since(start));
        log::debug!(
            "match '{}' method={:?} confidence={:.4} found={} in {:.2}ms",
            template.id(),
            self.options.method,
            result.confidence,
            result.found,
            result.elapsed_ms
        );
        Ok(result)
    }

    /// Sweep template scales from `scale_range.0` to `scale_range.1`
    /// inclusive, collecting every scale that clears the threshold.
    ///
    /// Scales are visited in ascending order; on exact confidence ties the
    /// earlier (lower) scale stays the best result, which keeps repeated
    /// sweeps reproducible.
    pub fn match_multi_scale(
        &self,
        source: &Frame,
        template: &Template,
    ) -> VisionResult<MultiScaleResult> {
        let start = Instant::now();
        self.options.validate()?;
        validate_strictly_smaller(source, template)?;

        let mut outcome = MultiScaleResult {
            matches: Vec::new(),
            best: None,
            total_ms: 0.0,
        };
        let area = match SearchArea::prepare(source, self.options.roi) {
            Ok(area) => area,
            Err(err) => {
                log::warn!(
                    "multi-scale match for template '{}' failed, reporting no match: {err}",
                    template.id()
                );
                outcome.total_ms = ms_since(start);
                return Ok(outcome);
            }
        };

        let threshold = f64::from(self.options.threshold);
        let (scale_min, scale_max) = self.options.scale_range;
        let steps = (f64::from(scale_max - scale_min) / f64::from(self.options.scale_step)).round()
            as u32;

        for index in 0..=steps {
            if self.cancelled() {
                log::debug!("multi-scale match for '{}' cancelled", template.id());
                break;
            }
            let scale = (f64::from(scale_min)
                + f64::from(index) * f64::from(self.options.scale_step))
                as f32;
            if scale > scale_max + SCALE_EPSILON {
                break;
            }

            let scale_start = Instant::now();
            let Some(scaled) = scale_gray(template.gray(), scale) else {
                continue;
            };
            if scaled.width() > area.gray.width() || scaled.height() > area.gray.height() {
                log::debug!(
                    "skipping scale {scale:.2} for '{}': {}x{} exceeds the {}x{} search area",
                    template.id(),
                    scaled.width(),
                    scaled.height(),
                    area.gray.width(),
                    area.gray.height()
                );
                continue;
            }

            let scan = self.scan(&area, &scaled, threshold, false);
            if let Some((confidence, _, _)) = scan.best
                && confidence >= threshold
            {
                let result =
                    self.best_to_result(&area, scan.best, &scaled, scale, ms_since(scale_start));
                if outcome
                    .best
                    .as_ref()
                    .is_none_or(|best| result.confidence > best.confidence)
                {
                    outcome.best = Some(result.clone());
                }
                outcome.matches.push(result);
            }
            if scan.cancelled {
                break;
            }
        }

        outcome.total_ms = ms_since(start);
        log::debug!(
            "multi-scale match '{}': {} qualifying scales in {:.2}ms",
            template.id(),
            outcome.matches.len(),
            outcome.total_ms
        );
        Ok(outcome)
    }

    /// Report every placement that clears the threshold, best first, capped
    /// at `max_matches`.
    ///
    /// No suppression of overlapping placements is performed: the positions
    /// immediately around a strong match usually clear the threshold as
    /// well, so one on-screen element can account for several entries near
    /// the cap. Callers that need distinct elements should cluster by
    /// distance themselves.
    pub fn find_all_matches(
        &self,
        source: &Frame,
        template: &Template,
    ) -> VisionResult<Vec<MatchResult>> {
        let start = Instant::now();
        self.options.validate()?;
        validate_strictly_smaller(source, template)?;

        let area = match SearchArea::prepare(source, self.options.roi) {
            Ok(area) => area,
            Err(err) => {
                log::warn!(
                    "exhaustive match for template '{}' failed, reporting no matches: {err}",
                    template.id()
                );
                return Ok(Vec::new());
            }
        };

        let threshold = f64::from(self.options.threshold);
        let scan = self.scan(&area, template.gray(), threshold, true);
        let mut hits = scan.hits;
        hits.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        hits.truncate(self.options.max_matches);

        let elapsed = ms_since(start);
        let (tw, th) = template.gray().dimensions();
        Ok(hits
            .into_iter()
            .map(|(confidence, x, y)| MatchResult {
                found: true,
                confidence: confidence as f32,
                region: Rect::new(area.origin.0 + x, area.origin.1 + y, tw, th),
                scale: 1.0,
                method: self.options.method,
                elapsed_ms: elapsed,
            })
            .collect())
    }

    fn best_to_result(
        &self,
        area: &SearchArea,
        best: Option<(f64, u32, u32)>,
        template: &GrayImage,
        scale: f32,
        elapsed_ms: f64,
    ) -> MatchResult {
        match best {
            Some((confidence, x, y)) => MatchResult {
                found: confidence >= f64::from(self.options.threshold),
                confidence: confidence as f32,
                region: Rect::new(
                    area.origin.0 + x,
                    area.origin.1 + y,
                    template.width(),
                    template.height(),
                ),
                scale,
                method: self.options.method,
                elapsed_ms,
            },
            None => MatchResult::not_found(self.options.method, elapsed_ms),
        }
    }

    /// Evaluate the similarity surface over every valid placement.
    ///
    /// Tracks the first-encountered maximum; with `collect` set, also
    /// gathers every placement at or above `threshold`.
    fn scan(&self, area: &SearchArea, template: &GrayImage, threshold: f64, collect: bool) -> Scan {
        let mut scan = Scan {
            best: None,
            hits: Vec::new(),
            cancelled: false,
        };
        let (sw, sh) = area.gray.dimensions();
        let (tw, th) = template.dimensions();
        if tw == 0 || th == 0 || tw > sw || th > sh {
            return scan;
        }

        let stats = TemplateStats::compute(template);
        let src = area.gray.as_raw();
        let tpl = template.as_raw();
        let method = self.options.method;

        for y in 0..=(sh - th) {
            if y % CANCEL_CHECK_ROWS == 0 && self.cancelled() {
                scan.cancelled = true;
                break;
            }
            for x in 0..=(sw - tw) {
                let cross = cross_sum(src, sw, tpl, tw, th, x, y) as f64;
                let sum_w = area.window_sum(x, y, tw, th) as f64;
                let sum_sq_w = area.window_sum_sq(x, y, tw, th) as f64;
                let confidence = confidence_at(method, &stats, cross, sum_w, sum_sq_w);

                if collect && confidence >= threshold {
                    scan.hits.push((confidence, x, y));
                }
                if scan.best.is_none_or(|(best, _, _)| confidence > best) {
                    scan.best = Some((confidence, x, y));
                }
            }
        }
        scan
    }
}

struct Scan {
    best: Option<(f64, u32, u32)>,
    hits: Vec<(f64, u32, u32)>,
    cancelled: bool,
}

/// Gray search area with precomputed integral images for window sums.
struct SearchArea {
    gray: GrayImage,
    /// Offset of the search area inside the source frame.
    origin: (u32, u32),
    integral: Vec<u64>,
    integral_sq: Vec<u64>,
}

impl SearchArea {
    fn prepare(source: &Frame, roi: Option<Rect>) -> VisionResult<SearchArea> {
        let full = source.to_gray();
        let (gray, origin) = match roi {
            Some(requested) => {
                let clipped = requested.clip_to(source.width(), source.height());
                if clipped.is_empty() {
                    return Err(VisionError::RegionOutOfBounds {
                        region: requested,
                        width: source.width(),
                        height: source.height(),
                    });
                }
                let view = imageops::crop_imm(
                    &full,
                    clipped.x,
                    clipped.y,
                    clipped.width,
                    clipped.height,
                );
                (view.to_image(), (clipped.x, clipped.y))
            }
            None => (full, (0, 0)),
        };
        let (integral, integral_sq) = integral_images(&gray);
        Ok(SearchArea {
            gray,
            origin,
            integral,
            integral_sq,
        })
    }

    fn window_sum(&self, x: u32, y: u32, w: u32, h: u32) -> u64 {
        sum_region(&self.integral, self.gray.width() + 1, x, y, w, h)
    }

    fn window_sum_sq(&self, x: u32, y: u32, w: u32, h: u32) -> u64 {
        sum_region(&self.integral_sq, self.gray.width() + 1, x, y, w, h)
    }
}

/// Per-template sums reused across every placement of one scan.
struct TemplateStats {
    count: f64,
    sum: f64,
    sum_sq: f64,
    /// Sum of squared deviations from the template mean.
    dev_sq: f64,
}

impl TemplateStats {
    fn compute(template: &GrayImage) -> Self {
        let mut sum = 0u64;
        let mut sum_sq = 0u64;
        for &px in template.as_raw() {
            let v = u64::from(px);
            sum += v;
            sum_sq += v * v;
        }
        let count = f64::from(template.width()) * f64::from(template.height());
        let sum = sum as f64;
        let sum_sq = sum_sq as f64;
        Self {
            count,
            sum,
            sum_sq,
            dev_sq: (sum_sq - sum * sum / count).max(0.0),
        }
    }
}

/// Confidence of one placement from its window sums and the cross term.
fn confidence_at(
    method: super::types::MatchMethod,
    template: &TemplateStats,
    cross: f64,
    sum_w: f64,
    sum_sq_w: f64,
) -> f64 {
    use super::types::MatchMethod;
    match method {
        MatchMethod::CcorrNormed => {
            let denom = (template.sum_sq * sum_sq_w).sqrt();
            if denom < DENOM_EPSILON {
                0.0
            } else {
                (cross / denom).clamp(0.0, 1.0)
            }
        }
        MatchMethod::CcoeffNormed => {
            let numer = cross - template.sum * sum_w / template.count;
            let dev_w_sq = (sum_sq_w - sum_w * sum_w / template.count).max(0.0);
            let denom = (template.dev_sq * dev_w_sq).sqrt();
            if denom < DENOM_EPSILON {
                0.0
            } else {
                (numer / denom).clamp(0.0, 1.0)
            }
        }
        MatchMethod::SqdiffNormed => {
            let denom = (template.sum_sq * sum_sq_w).sqrt();
            if denom < DENOM_EPSILON {
                // Two featureless black patches are identical by definition.
                if template.sum_sq == 0.0 && sum_sq_w == 0.0 {
                    1.0
                } else {
                    0.0
                }
            } else {
                let raw = (template.sum_sq + sum_sq_w - 2.0 * cross) / denom;
                (1.0 - raw).clamp(0.0, 1.0)
            }
        }
    }
}

/// Sum of `source[window] * template` over one placement.
fn cross_sum(src: &[u8], src_width: u32, tpl: &[u8], tw: u32, th: u32, x: u32, y: u32) -> u64 {
    let mut acc = 0u64;
    for ty in 0..th {
        let s0 = ((y + ty) * src_width + x) as usize;
        let t0 = (ty * tw) as usize;
        let src_row = &src[s0..s0 + tw as usize];
        let tpl_row = &tpl[t0..t0 + tw as usize];
        for (s, t) in src_row.iter().zip(tpl_row) {
            acc += u64::from(*s) * u64::from(*t);
        }
    }
    acc
}

/// Row-major integral images of pixel values and squared pixel values,
/// both `(width + 1) * (height + 1)` with a zero first row and column.
fn integral_images(image: &GrayImage) -> (Vec<u64>, Vec<u64>) {
    let (width, height) = image.dimensions();
    let stride = (width + 1) as usize;
    let mut integral = vec![0u64; stride * (height + 1) as usize];
    let mut integral_sq = vec![0u64; stride * (height + 1) as usize];
    let raw = image.as_raw();

    for y in 0..height as usize {
        let row = &raw[y * width as usize..(y + 1) * width as usize];
        let mut line_sum = 0u64;
        let mut line_sum_sq = 0u64;
        for (x, &px) in row.iter().enumerate() {
            let v = u64::from(px);
            line_sum += v;
            line_sum_sq += v * v;
            let idx = (y + 1) * stride + x + 1;
            integral[idx] = integral[idx - stride] + line_sum;
            integral_sq[idx] = integral_sq[idx - stride] + line_sum_sq;
        }
    }
    (integral, integral_sq)
}

fn sum_region(integral: &[u64], stride: u32, x: u32, y: u32, w: u32, h: u32) -> u64 {
    let stride = stride as usize;
    let (x1, y1) = (x as usize, y as usize);
    let (x2, y2) = ((x + w) as usize, (y + h) as usize);
    integral[y2 * stride + x2] + integral[y1 * stride + x1]
        - integral[y1 * stride + x2]
        - integral[y2 * stride + x1]
}

/// Resize the gray template for one scale step; `None` when the scaled
/// template would collapse to zero pixels.
fn scale_gray(template: &GrayImage, scale: f32) -> Option<GrayImage> {
    if (scale - 1.0).abs() < 1e-3 {
        return Some(template.clone());
    }
    let width = (template.width() as f32 * scale).round() as u32;
    let height = (template.height() as f32 * scale).round() as u32;
    if width == 0 || height == 0 {
        return None;
    }
    Some(imageops::resize(
        template,
        width,
        height,
        imageops::FilterType::Triangle,
    ))
}

fn validate_strictly_smaller(source: &Frame, template: &Template) -> VisionResult<()> {
    if template.width() >= source.width() || template.height() >= source.height() {
        return Err(VisionError::InvalidTemplateSize {
            id: template.id().to_string(),
            width: template.width(),
            height: template.height(),
            detail: format!(
                "template must be strictly smaller than the {}x{} source",
                source.width(),
                source.height()
            ),
        });
    }
    Ok(())
}

fn ms_since(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
