//! Heatmap controller: shading setup and periodic value refresh
//!
//! The controller moves through `Uninitialized -> Configured -> Running`.
//! Configuration builds the shading surface on the visualization layer and
//! registers one color ramp per sensor type. Starting it renders the first
//! values and spawns a refresh task that pulls a value for every shading
//! point on a fixed interval. The task handle is owned by the controller and
//! aborted on [`HeatmapController::unload`] or drop, so no update reaches a
//! disposed surface.
//!
//! A tick that fires while the previous tick is still waiting on telemetry
//! or on the visualization layer is skipped rather than run concurrently.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

use crate::device::SensorType;
use crate::host::{DataVisualization, HostError};
use crate::shading::{ShadingOptions, ShadingSample, ShadingSurface};
use crate::style::{ColorRamp, ColorRamps};
use crate::telemetry::TelemetrySource;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HeatmapError {
    #[error("Shading surface has no nodes")]
    EmptySurface,
    #[error("Heatmap has not been configured")]
    NotConfigured,
    #[error("Heatmap controller has been unloaded")]
    Unloaded,
    #[error(transparent)]
    Host(#[from] HostError),
}

/// Heatmap configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapSettings {
    /// Refresh period in milliseconds
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    /// Sensor type the heatmap is shaded by
    #[serde(default = "default_active_sensor_type")]
    pub active_sensor_type: SensorType,
    /// Level to isolate before shading, if the host supports it
    #[serde(default)]
    pub select_level: Option<String>,
    #[serde(default)]
    pub shading: ShadingOptions,
}

fn default_refresh_interval_ms() -> u64 {
    200
}

fn default_active_sensor_type() -> SensorType {
    SensorType::new("temperature")
}

impl Default for HeatmapSettings {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval_ms(),
            active_sensor_type: default_active_sensor_type(),
            select_level: None,
            shading: ShadingOptions::default(),
        }
    }
}

impl HeatmapSettings {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(1))
    }
}

/// Lifecycle phase of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatmapPhase {
    Uninitialized,
    Configured,
    Running,
    /// Unloaded; the controller no longer touches the host
    Disposed,
}

/// Result of one refresh tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Values pushed for this many samples
    Updated(usize),
    /// The previous tick was still in flight
    Skipped,
    /// The visualization layer rejected the update
    Failed,
    /// The surface was torn down while the tick was running
    Cancelled,
}

/// Tick counters since configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickStats {
    pub completed: u64,
    pub skipped: u64,
    pub failed: u64,
}

/// Runs refresh ticks against one configured surface
struct Refresher {
    surface: ShadingSurface,
    visualization: Arc<dyn DataVisualization>,
    telemetry: Arc<dyn TelemetrySource>,
    in_flight: AtomicBool,
    disposed: AtomicBool,
    completed: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
}

/// Clears the in-flight flag, also when the tick future is dropped
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Refresher {
    async fn collect_samples(&self) -> Vec<ShadingSample> {
        let mut samples = Vec::with_capacity(self.surface.point_count());
        for point in self.surface.points() {
            for sensor_type in &point.sensor_types {
                match self.telemetry.read(&point.id, sensor_type).await {
                    Some(value) if value.is_finite() => samples.push(ShadingSample {
                        point_id: point.id.clone(),
                        sensor_type: sensor_type.clone(),
                        value,
                    }),
                    Some(value) => {
                        trace!(point = %point.id, sensor_type = %sensor_type, value, "Dropping non-finite reading")
                    }
                    None => trace!(point = %point.id, sensor_type = %sensor_type, "No reading"),
                }
            }
        }
        samples
    }

    async fn tick(&self) -> TickOutcome {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            debug!(surface = %self.surface.name, "Previous refresh still running, skipping tick");
            return TickOutcome::Skipped;
        }
        let _in_flight = InFlight(&self.in_flight);

        let samples = self.collect_samples().await;
        if self.disposed.load(Ordering::Acquire) {
            debug!(surface = %self.surface.name, "Surface removed during refresh, dropping values");
            return TickOutcome::Cancelled;
        }
        match self.visualization.update_surface_shading(&samples).await {
            Ok(()) => {
                self.completed.fetch_add(1, Ordering::Relaxed);
                trace!(surface = %self.surface.name, samples = samples.len(), "Shading refreshed");
                TickOutcome::Updated(samples.len())
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                warn!(surface = %self.surface.name, error = %e, "Shading refresh rejected");
                TickOutcome::Failed
            }
        }
    }

    fn stats(&self) -> TickStats {
        TickStats {
            completed: self.completed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

enum Phase {
    Uninitialized,
    Configured(Arc<Refresher>),
    Running {
        refresher: Arc<Refresher>,
        task: JoinHandle<()>,
    },
    Disposed,
}

/// Owns the shading surface and its refresh task
pub struct HeatmapController {
    visualization: Arc<dyn DataVisualization>,
    telemetry: Arc<dyn TelemetrySource>,
    ramps: ColorRamps,
    phase: Phase,
}

impl HeatmapController {
    pub fn new(
        visualization: Arc<dyn DataVisualization>,
        telemetry: Arc<dyn TelemetrySource>,
    ) -> Self {
        Self {
            visualization,
            telemetry,
            ramps: ColorRamps::new(),
            phase: Phase::Uninitialized,
        }
    }

    pub fn phase(&self) -> HeatmapPhase {
        match self.phase {
            Phase::Uninitialized => HeatmapPhase::Uninitialized,
            Phase::Configured(_) => HeatmapPhase::Configured,
            Phase::Running { .. } => HeatmapPhase::Running,
            Phase::Disposed => HeatmapPhase::Disposed,
        }
    }

    fn refresher(&self) -> Option<&Arc<Refresher>> {
        match &self.phase {
            Phase::Configured(refresher) | Phase::Running { refresher, .. } => Some(refresher),
            _ => None,
        }
    }

    pub fn surface(&self) -> Option<&ShadingSurface> {
        self.refresher().map(|r| &r.surface)
    }

    pub fn ramps(&self) -> &ColorRamps {
        &self.ramps
    }

    pub fn stats(&self) -> TickStats {
        self.refresher().map(|r| r.stats()).unwrap_or_default()
    }

    /// Set up shading for `surface` and register the color ramps
    ///
    /// Calling this again once configured leaves the existing surface in place.
    pub async fn configure(
        &mut self,
        surface: ShadingSurface,
        ramps: &ColorRamps,
        options: &ShadingOptions,
    ) -> Result<(), HeatmapError> {
        match self.phase {
            Phase::Uninitialized => {}
            Phase::Configured(_) | Phase::Running { .. } => {
                debug!("Heatmap already configured");
                return Ok(());
            }
            Phase::Disposed => return Err(HeatmapError::Unloaded),
        }
        if surface.is_empty() {
            return Err(HeatmapError::EmptySurface);
        }

        self.visualization
            .setup_surface_shading(&surface, options)
            .await?;
        for (sensor_type, ramp) in ramps.iter() {
            self.register_colors(sensor_type.clone(), *ramp);
        }

        info!(
            surface = %surface.name,
            nodes = surface.nodes.len(),
            points = surface.point_count(),
            ramps = self.ramps.len(),
            "Surface shading configured"
        );
        self.phase = Phase::Configured(Arc::new(Refresher {
            surface,
            visualization: self.visualization.clone(),
            telemetry: self.telemetry.clone(),
            in_flight: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            completed: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }));
        Ok(())
    }

    /// Register or replace the ramp for one sensor type
    pub fn register_colors(&mut self, sensor_type: SensorType, ramp: ColorRamp) {
        if matches!(self.phase, Phase::Disposed) {
            return;
        }
        self.visualization
            .register_surface_shading_colors(&sensor_type, ramp);
        if self.ramps.register(sensor_type.clone(), ramp).is_some() {
            debug!(sensor_type = %sensor_type, "Replaced color ramp");
        }
    }

    /// Render the first values and start the periodic refresh
    pub async fn start(
        &mut self,
        sensor_type: &SensorType,
        interval: Duration,
    ) -> Result<(), HeatmapError> {
        let refresher = match &self.phase {
            Phase::Configured(refresher) => refresher.clone(),
            Phase::Running { .. } => {
                debug!("Heatmap refresh already running");
                return Ok(());
            }
            Phase::Uninitialized => return Err(HeatmapError::NotConfigured),
            Phase::Disposed => return Err(HeatmapError::Unloaded),
        };

        let samples = refresher.collect_samples().await;
        self.visualization
            .render_surface_shading(&refresher.surface.node_ids(), sensor_type, &samples)
            .await?;

        let task = tokio::spawn(refresh_loop(refresher.clone(), interval));
        info!(
            surface = %refresher.surface.name,
            sensor_type = %sensor_type,
            interval_ms = interval.as_millis() as u64,
            "Heatmap refresh started"
        );
        self.phase = Phase::Running { refresher, task };
        Ok(())
    }

    /// Run one refresh tick now, outside the timer
    pub async fn refresh_now(&self) -> Result<TickOutcome, HeatmapError> {
        match self.refresher() {
            Some(refresher) => Ok(refresher.tick().await),
            None if matches!(self.phase, Phase::Disposed) => Err(HeatmapError::Unloaded),
            None => Err(HeatmapError::NotConfigured),
        }
    }

    /// Cancel the refresh task and tear the shading down
    ///
    /// Returns false if there was nothing to tear down.
    pub fn unload(&mut self) -> bool {
        let previous = std::mem::replace(&mut self.phase, Phase::Disposed);
        match previous {
            Phase::Running { task, refresher } => {
                refresher.disposed.store(true, Ordering::Release);
                task.abort();
                self.visualization.remove_surface_shading();
                info!(surface = %refresher.surface.name, "Heatmap refresh stopped");
                true
            }
            Phase::Configured(refresher) => {
                refresher.disposed.store(true, Ordering::Release);
                self.visualization.remove_surface_shading();
                debug!(surface = %refresher.surface.name, "Heatmap shading removed");
                true
            }
            Phase::Uninitialized | Phase::Disposed => false,
        }
    }
}

impl Drop for HeatmapController {
    fn drop(&mut self) {
        if let Phase::Running { task, .. } = &self.phase {
            task.abort();
        }
    }
}

async fn refresh_loop(refresher: Arc<Refresher>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately; values were just rendered
    ticker.tick().await;

    // Ticks run as child tasks so a slow one does not stall the timer.
    // Dropping the set on abort cancels a tick still in flight.
    let mut ticks = JoinSet::new();
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let refresher = refresher.clone();
                ticks.spawn(async move { refresher.tick().await });
            }
            Some(_) = ticks.join_next(), if !ticks.is_empty() => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Device, DeviceId};
    use crate::geometry::Point3;
    use crate::scene::SceneLayer;
    use crate::telemetry::ConstantTelemetry;
    use crate::viewable::ViewableData;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Setup(usize),
        Colors(SensorType, ColorRamp),
        Render(Vec<String>, SensorType, usize),
        Update(usize),
        Remove,
    }

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<Call>>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self, f: impl Fn(&Call) -> bool) -> usize {
            self.calls.lock().unwrap().iter().filter(|c| f(c)).count()
        }

        fn push(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl DataVisualization for Recorder {
        async fn add_viewables(&self, _data: ViewableData) -> Result<(), HostError> {
            Ok(())
        }

        fn remove_all_viewables(&self) {}

        async fn setup_surface_shading(
            &self,
            surface: &ShadingSurface,
            _options: &ShadingOptions,
        ) -> Result<(), HostError> {
            self.push(Call::Setup(surface.nodes.len()));
            Ok(())
        }

        fn register_surface_shading_colors(&self, sensor_type: &SensorType, ramp: ColorRamp) {
            self.push(Call::Colors(sensor_type.clone(), ramp));
        }

        async fn render_surface_shading(
            &self,
            node_ids: &[String],
            sensor_type: &SensorType,
            samples: &[ShadingSample],
        ) -> Result<(), HostError> {
            self.push(Call::Render(node_ids.to_vec(), sensor_type.clone(), samples.len()));
            Ok(())
        }

        async fn update_surface_shading(&self, samples: &[ShadingSample]) -> Result<(), HostError> {
            self.push(Call::Update(samples.len()));
            Ok(())
        }

        fn remove_surface_shading(&self) {
            self.push(Call::Remove);
        }
    }

    /// Takes `delay` to produce each reading
    struct SlowTelemetry(Duration);

    #[async_trait]
    impl TelemetrySource for SlowTelemetry {
        async fn read(&self, _point_id: &str, _sensor_type: &SensorType) -> Option<f64> {
            tokio::time::sleep(self.0).await;
            Some(0.5)
        }
    }

    fn devices() -> Vec<Device> {
        vec![
            Device::new(
                DeviceId::new("A"),
                Some(Point3::new(0.0, 0.0, 0.0)),
                vec!["temperature".into()],
            )
            .unwrap(),
            Device::new(DeviceId::new("B"), None, vec!["temperature".into()]).unwrap(),
        ]
    }

    fn surface() -> ShadingSurface {
        ShadingSurface::from_devices("Level 1", &devices())
    }

    fn temperature() -> SensorType {
        SensorType::new("temperature")
    }

    fn ramps() -> ColorRamps {
        let mut ramps = ColorRamps::new();
        ramps.register(temperature(), ColorRamp::new(0xff0000, 0x0000ff));
        ramps
    }

    #[tokio::test]
    async fn test_configure_excludes_unresolved_device() {
        let recorder = Arc::new(Recorder::default());
        let mut controller =
            HeatmapController::new(recorder.clone(), Arc::new(ConstantTelemetry(0.5)));

        controller
            .configure(surface(), &ramps(), &ShadingOptions::default())
            .await
            .unwrap();

        assert_eq!(controller.phase(), HeatmapPhase::Configured);
        let surface = controller.surface().unwrap();
        assert!(surface.contains_node("A"));
        assert!(!surface.contains_node("B"));
        assert_eq!(
            recorder.calls(),
            vec![
                Call::Setup(1),
                Call::Colors(temperature(), ColorRamp::new(0xff0000, 0x0000ff)),
            ]
        );
    }

    #[tokio::test]
    async fn test_configure_is_idempotent() {
        let recorder = Arc::new(Recorder::default());
        let mut controller =
            HeatmapController::new(recorder.clone(), Arc::new(ConstantTelemetry(0.5)));
        let options = ShadingOptions::default();

        controller.configure(surface(), &ramps(), &options).await.unwrap();
        controller.configure(surface(), &ramps(), &options).await.unwrap();

        assert_eq!(recorder.count(|c| matches!(c, Call::Setup(_))), 1);
    }

    #[tokio::test]
    async fn test_configure_rejects_empty_surface() {
        let recorder = Arc::new(Recorder::default());
        let mut controller =
            HeatmapController::new(recorder.clone(), Arc::new(ConstantTelemetry(0.5)));
        let empty = ShadingSurface::from_devices("Level 1", &devices()[1..]);

        let err = controller
            .configure(empty, &ramps(), &ShadingOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err, HeatmapError::EmptySurface);
        assert_eq!(controller.phase(), HeatmapPhase::Uninitialized);
        assert!(recorder.calls().is_empty());
    }

    #[tokio::test]
    async fn test_start_requires_configuration() {
        let mut controller = HeatmapController::new(
            Arc::new(Recorder::default()),
            Arc::new(ConstantTelemetry(0.5)),
        );
        let err = controller
            .start(&temperature(), Duration::from_millis(200))
            .await
            .unwrap_err();
        assert_eq!(err, HeatmapError::NotConfigured);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_runs_on_interval() {
        let recorder = Arc::new(Recorder::default());
        let mut controller =
            HeatmapController::new(recorder.clone(), Arc::new(ConstantTelemetry(0.5)));
        controller
            .configure(surface(), &ramps(), &ShadingOptions::default())
            .await
            .unwrap();
        controller
            .start(&temperature(), Duration::from_millis(200))
            .await
            .unwrap();
        assert_eq!(controller.phase(), HeatmapPhase::Running);
        assert_eq!(
            recorder.count(|c| matches!(c, Call::Render(ids, _, 1) if ids == &vec!["A".to_string()])),
            1
        );

        tokio::time::sleep(Duration::from_millis(1010)).await;

        let updates = recorder.count(|c| matches!(c, Call::Update(1)));
        assert!((4..=5).contains(&updates), "got {updates} updates");
        assert_eq!(controller.stats().completed as usize, updates);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unload_cancels_refresh() {
        let recorder = Arc::new(Recorder::default());
        let mut controller =
            HeatmapController::new(recorder.clone(), Arc::new(ConstantTelemetry(0.5)));
        controller
            .configure(surface(), &ramps(), &ShadingOptions::default())
            .await
            .unwrap();
        controller
            .start(&temperature(), Duration::from_millis(200))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(450)).await;

        assert!(controller.unload());
        let updates = recorder.count(|c| matches!(c, Call::Update(_)));
        tokio::time::sleep(Duration::from_millis(2000)).await;

        assert_eq!(recorder.count(|c| matches!(c, Call::Update(_))), updates);
        assert_eq!(recorder.calls().last(), Some(&Call::Remove));
        assert_eq!(controller.phase(), HeatmapPhase::Disposed);
        assert!(controller.surface().is_none());
        assert!(!controller.unload());
        assert_eq!(
            controller.refresh_now().await.unwrap_err(),
            HeatmapError::Unloaded
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_in_flight_at_unload_pushes_nothing() {
        let recorder = Arc::new(Recorder::default());
        let mut controller = HeatmapController::new(
            recorder.clone(),
            Arc::new(SlowTelemetry(Duration::from_millis(100))),
        );
        controller
            .configure(surface(), &ramps(), &ShadingOptions::default())
            .await
            .unwrap();

        let refresher = controller.refresher().unwrap().clone();
        let tick = tokio::spawn(async move { refresher.tick().await });
        // Let the tick start waiting on telemetry
        tokio::task::yield_now().await;

        assert!(controller.unload());
        assert_eq!(tick.await.unwrap(), TickOutcome::Cancelled);
        assert_eq!(recorder.count(|c| matches!(c, Call::Update(_))), 0);
        assert_eq!(recorder.calls().last(), Some(&Call::Remove));
    }

    #[tokio::test]
    async fn test_configure_after_unload_is_rejected() {
        let recorder = Arc::new(Recorder::default());
        let mut controller =
            HeatmapController::new(recorder.clone(), Arc::new(ConstantTelemetry(0.5)));
        let options = ShadingOptions::default();
        controller.configure(surface(), &ramps(), &options).await.unwrap();
        assert!(controller.unload());

        let err = controller
            .configure(surface(), &ramps(), &options)
            .await
            .unwrap_err();

        assert_eq!(err, HeatmapError::Unloaded);
        assert_eq!(controller.phase(), HeatmapPhase::Disposed);
        assert_eq!(recorder.count(|c| matches!(c, Call::Setup(_))), 1);
        assert_eq!(
            controller
                .start(&temperature(), Duration::from_millis(200))
                .await
                .unwrap_err(),
            HeatmapError::Unloaded
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_tick_is_skipped() {
        let recorder = Arc::new(Recorder::default());
        let mut controller = HeatmapController::new(
            recorder.clone(),
            Arc::new(SlowTelemetry(Duration::from_millis(50))),
        );
        controller
            .configure(surface(), &ramps(), &ShadingOptions::default())
            .await
            .unwrap();

        let (first, second) = tokio::join!(controller.refresh_now(), controller.refresh_now());

        assert_eq!(first.unwrap(), TickOutcome::Updated(1));
        assert_eq!(second.unwrap(), TickOutcome::Skipped);
        assert_eq!(
            controller.stats(),
            TickStats {
                completed: 1,
                skipped: 1,
                failed: 0
            }
        );

        // The flag is released once the tick finishes
        assert_eq!(controller.refresh_now().await.unwrap(), TickOutcome::Updated(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_refresh_skips_timer_ticks() {
        let recorder = Arc::new(Recorder::default());
        let mut controller = HeatmapController::new(
            recorder.clone(),
            Arc::new(SlowTelemetry(Duration::from_millis(450))),
        );
        controller
            .configure(surface(), &ramps(), &ShadingOptions::default())
            .await
            .unwrap();
        controller
            .start(&temperature(), Duration::from_millis(200))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(3000)).await;

        let stats = controller.stats();
        assert!(stats.skipped > 0, "{stats:?}");
        assert!(stats.completed > 0, "{stats:?}");
        assert_eq!(
            recorder.count(|c| matches!(c, Call::Update(_))) as u64,
            stats.completed
        );
    }

    #[tokio::test]
    async fn test_non_finite_readings_are_dropped() {
        let recorder = Arc::new(Recorder::default());
        let mut controller =
            HeatmapController::new(recorder.clone(), Arc::new(ConstantTelemetry(f64::NAN)));
        controller
            .configure(surface(), &ramps(), &ShadingOptions::default())
            .await
            .unwrap();

        assert_eq!(controller.refresh_now().await.unwrap(), TickOutcome::Updated(0));
    }

    #[tokio::test]
    async fn test_replaced_ramp_is_used_for_refresh() {
        let layer = Arc::new(SceneLayer::new());
        let mut controller =
            HeatmapController::new(layer.clone(), Arc::new(ConstantTelemetry(1.0)));
        controller
            .configure(surface(), &ramps(), &ShadingOptions::default())
            .await
            .unwrap();

        controller.refresh_now().await.unwrap();
        assert_eq!(layer.shaded_samples()[0].color, 0x0000ff);

        controller.register_colors(temperature(), ColorRamp::new(0x000000, 0x00ff00));
        assert_eq!(controller.ramps().len(), 1);
        assert_eq!(layer.color_ramps().len(), 1);

        controller.refresh_now().await.unwrap();
        let samples = layer.shaded_samples();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].color, 0x00ff00);
    }
}
