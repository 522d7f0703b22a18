//! Stage duration estimation.
//!
//! Projects how long each stage will take from the order's item count. The
//! projection feeds the provisional `ended_at` on an open stage entry and,
//! for the shipping stage, the order's estimated delivery timestamp.
//! Durations carry a random ±20% spread; in demo mode everything is scaled
//! down from minutes to seconds so a full run finishes quickly.

use chrono::Duration;
use fulfillment_types::Stage;
use rand::Rng;

/// Duration estimator, configured for realistic or demo-scale timings.
#[derive(Debug, Clone, Copy)]
pub struct TimingProfile {
	realistic: bool,
}

impl TimingProfile {
	pub fn new(realistic: bool) -> Self {
		Self { realistic }
	}

	/// Demo-scale profile used in tests and local runs.
	pub fn demo() -> Self {
		Self::new(false)
	}

	/// Returns the projected duration of the given stage.
	pub fn duration_for(&self, stage: Stage, item_count: u32) -> Duration {
		let minutes = match stage {
			Stage::Cooking => self.cooking_minutes(item_count),
			Stage::Packing => self.packing_minutes(item_count),
			Stage::Shipping => self.shipping_minutes(),
			Stage::Processing | Stage::Received => 0.0,
		};
		Duration::seconds((minutes * 60.0) as i64)
	}

	fn cooking_minutes(&self, item_count: u32) -> f64 {
		let (base, per_item) = if self.realistic { (10.0, 5.0) } else { (1.0, 0.5) };
		jitter(base + per_item * f64::from(item_count))
	}

	fn packing_minutes(&self, item_count: u32) -> f64 {
		let (base, per_item) = if self.realistic { (5.0, 2.0) } else { (0.5, 0.3) };
		jitter(base + per_item * f64::from(item_count))
	}

	fn shipping_minutes(&self) -> f64 {
		// Shipping varies with traffic and distance rather than order size.
		let (min, max) = if self.realistic { (15.0, 45.0) } else { (1.0, 3.0) };
		rand::thread_rng().gen_range(min..max)
	}
}

/// Applies a ±20% random spread.
fn jitter(minutes: f64) -> f64 {
	minutes * rand::thread_rng().gen_range(0.8..1.2)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn passive_stages_take_no_time() {
		let profile = TimingProfile::demo();
		assert_eq!(profile.duration_for(Stage::Processing, 5), Duration::zero());
		assert_eq!(profile.duration_for(Stage::Received, 5), Duration::zero());
	}

	#[test]
	fn cooking_grows_with_item_count() {
		let profile = TimingProfile::new(true);
		// Even with maximum downward jitter, a 10-item order outlasts a
		// 1-item order's maximum upward jitter.
		let small = profile.duration_for(Stage::Cooking, 1);
		let large = profile.duration_for(Stage::Cooking, 10);
		assert!(large > small, "large={large}, small={small}");
	}

	#[test]
	fn demo_durations_stay_in_demo_scale() {
		let profile = TimingProfile::demo();
		for _ in 0..20 {
			let shipping = profile.duration_for(Stage::Shipping, 1);
			assert!(shipping >= Duration::seconds(60));
			assert!(shipping <= Duration::seconds(180));
		}
	}
}
