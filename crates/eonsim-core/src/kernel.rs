//! The discrete-event loop: arrivals, departures, warm-up, and sampling.

use log::info;

use crate::dispatch::{Carriers, Dispatcher};
use crate::event::{Event, EventKind, EventQueue};
use crate::fragmentation::FragmentationMetric;
use crate::network::routing::{link_key, RouteStrategy, Router};
use crate::network::topology::Vertex;
use crate::prng::{Prng, PrngError};
use crate::request::Request;
use crate::settings::{Settings, SettingsError};
use crate::spectrum::Spectrum;
use crate::stats::Statistics;

/// The simulation kernel.
///
/// Construction validates the settings, lays out one [`Spectrum`] per
/// directed edge, and performs the first [`reset`](Self::reset). One call to
/// [`run`](Self::run) simulates one iteration; `reset` prepares the next.
///
/// The loop's standing invariant: every arrival schedules the following
/// arrival, so the queue always holds exactly one pending arrival plus one
/// pending departure per active request.
#[derive(Debug)]
pub struct Kernel {
    settings: Settings,
    dispatcher: Dispatcher,
    router: Router,
    prng: Prng,
    queue: EventQueue,
    statistics: Statistics,
    snapshots: Vec<Statistics>,
    /// Simulated time below which statistics are provisional when
    /// `ignore_first` is set; one tenth of the horizon.
    warmup_cutoff: f64,
    warmup_applied: bool,
}

/// Kernel construction error.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// The settings fail validation.
    #[error("invalid settings")]
    InvalidSettings(#[from] SettingsError),

    /// A random stream could not be installed.
    #[error("failed to install a random stream")]
    Prng(#[from] PrngError),
}

impl Kernel {
    pub fn new(settings: Settings) -> Result<Self, KernelError> {
        settings.validate()?;
        let mut kernel = Self {
            warmup_cutoff: 0.1 * settings.time_units,
            dispatcher: Dispatcher::new(Carriers::default()),
            router: Router::new(RouteStrategy::Random),
            prng: Prng::from_entropy(),
            queue: EventQueue::new(),
            statistics: Statistics::default(),
            snapshots: Vec::new(),
            warmup_applied: false,
            settings,
        };
        kernel.reset()?;
        Ok(kernel)
    }

    /// Returns the kernel to its freshly-constructed state: fresh spectra on
    /// every link, a reseeded engine with all five streams installed, random
    /// routing with an empty memo, and the first arrival pending.
    pub fn reset(&mut self) -> Result<(), KernelError> {
        self.statistics = Statistics::default();
        self.snapshots.clear();
        self.warmup_applied = false;
        self.queue.clear();
        for ty in &mut self.settings.request_types {
            ty.counting = 0;
            ty.blocking = 0;
        }
        let width = self.settings.fsus_per_link.into_usize();
        let carriers = self
            .settings
            .topology
            .edges()
            .map(|edge| (link_key(edge.source, edge.destination), Spectrum::new(width)))
            .collect();
        self.dispatcher = Dispatcher::new(carriers);
        match self.settings.seed {
            Some(seed) => self.prng.set_seed(seed),
            None => self.prng.reseed_from_entropy(),
        }
        self.prng
            .set_exponential("arrival", self.settings.arrival_rate)?;
        self.prng
            .set_exponential("service", self.settings.service_rate)?;
        let ratios = self
            .settings
            .request_types
            .iter()
            .map(|ty| ty.ratio)
            .collect::<Vec<_>>();
        self.prng.set_discrete("fsus", &ratios)?;
        self.prng
            .set_uniform("routing", 0.0, self.settings.topology.size() as f64)?;
        self.prng.set_uniform("random_fit", 0.0, 1.0)?;
        self.router = Router::new(RouteStrategy::Random);
        self.schedule_next_arrival();
        Ok(())
    }

    /// Whether a pending event lies within the simulated horizon.
    pub fn has_next(&self) -> bool {
        self.queue
            .peek()
            .map_or(false, |event| event.time <= self.settings.time_units)
    }

    /// Runs one full iteration.
    pub fn run(&mut self) {
        while self.has_next() {
            self.next();
        }
    }

    /// Pops and handles one event.
    pub fn next(&mut self) {
        let Some(event) = self.queue.pop() else {
            return;
        };
        self.statistics.time = event.time;
        if self.settings.ignore_first && !self.warmup_applied && event.time > self.warmup_cutoff {
            self.discard_warmup(event.time);
        }
        match event.kind {
            EventKind::Departure => {
                // The pending-arrival invariant keeps the loop running, so a
                // departure schedules nothing.
                self.handle_departure(event);
                return;
            }
            EventKind::Arrival => self.handle_arrival(event),
        }
        self.sample_if_due();
        self.schedule_next_arrival();
    }

    fn handle_departure(&mut self, event: Event) {
        self.statistics.active_requests -= 1;
        info!(
            "request for {} FSU(s) departing at {:.3}",
            event.request.fsus, event.time
        );
        self.dispatcher.release(&event.request);
    }

    fn handle_arrival(&mut self, mut event: Event) {
        event.request.accepted = false;
        let below_cap =
            self.statistics.active_requests < self.settings.fsus_per_link.into_u64();
        if below_cap && self.dispatcher.dispatch(&mut event.request, &mut self.prng) {
            self.statistics.active_requests += 1;
            event.request.accepted = true;
            info!(
                "accepting request for {} FSU(s) at {:.3}",
                event.request.fsus, event.time
            );
            let departs_at = self.statistics.time + self.prng.next("service");
            self.queue.push(Event::departure(departs_at, event.request));
        } else {
            info!(
                "blocking request for {} FSU(s) at {:.3}",
                event.request.fsus, event.time
            );
            self.statistics.total_fsus_blocked += event.request.fsus;
            if let Some(ty) = self
                .settings
                .request_types
                .iter_mut()
                .find(|ty| ty.fsus == event.request.fsus)
            {
                ty.blocking += 1;
            }
            self.statistics.total_requests_blocked += 1;
        }
    }

    /// Zeroes every counter accumulated during warm-up. Requests still in
    /// flight stay active; their departures will decrement `active_requests`
    /// without appearing in the discarded totals.
    fn discard_warmup(&mut self, time: f64) {
        self.warmup_applied = true;
        self.statistics = Statistics {
            time,
            active_requests: self.statistics.active_requests,
            ..Statistics::default()
        };
        for ty in &mut self.settings.request_types {
            ty.counting = 0;
            ty.blocking = 0;
        }
        info!("discarding statistics for the first {time:.3} time units");
    }

    /// Records a snapshot when at least `sampling_time` has passed since the
    /// previous one, summing each fragmentation metric over every link.
    fn sample_if_due(&mut self) {
        let due = self.snapshots.last().map_or(true, |snapshot| {
            (snapshot.time - self.statistics.time).abs() >= self.settings.sampling_time
        });
        if !due {
            return;
        }
        let entropy = FragmentationMetric::EntropyBased {
            min_fsus: self.settings.min_fsus(),
        };
        let mut absolute_sum = 0.0;
        let mut entropy_sum = 0.0;
        let mut external_sum = 0.0;
        for spectrum in self.dispatcher.carriers().values() {
            absolute_sum += FragmentationMetric::Absolute.measure(spectrum);
            entropy_sum += entropy.measure(spectrum);
            external_sum += FragmentationMetric::External.measure(spectrum);
        }
        self.statistics.absolute_fragmentation = absolute_sum;
        self.statistics.entropy_fragmentation = entropy_sum;
        self.statistics.external_fragmentation = external_sum;
        self.snapshots.push(self.statistics.clone());
    }

    /// Draws the next request's type and route, and enqueues its arrival.
    fn schedule_next_arrival(&mut self) {
        let index = self.prng.next("fsus") as usize;
        let ty = &mut self.settings.request_types[index];
        ty.counting += 1;
        let fsus = ty.fsus;
        let allocator = ty.allocator;
        let route = self
            .router
            .compute(
                &self.settings.topology,
                &mut self.prng,
                Vertex::NULL,
                Vertex::NULL,
            )
            .expect("random routing draws pairs until one is connected");
        let arrives_at = self.statistics.time + self.prng.next("arrival");
        self.queue
            .push(Event::arrival(arrives_at, Request::new(fsus, allocator, route)));
        self.statistics.total_fsus_requested += fsus;
        self.statistics.total_requests += 1;
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    pub fn snapshots(&self) -> &[Statistics] {
        &self.snapshots
    }

    /// The seed of the current iteration, for the report.
    pub fn seed(&self) -> u64 {
        self.prng.seed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use crate::units::Fsus;

    #[test]
    fn light_load_accepts_everything() {
        // Mean inter-arrival 20 versus mean service 0.001: overlap enough to
        // block a 4-slot link never happens.
        let mut settings = testing::two_node_settings(0.05, 1000.0);
        settings.time_units = 200.0;
        settings.seed = Some(0xE0E0);
        let mut kernel = Kernel::new(settings).unwrap();
        kernel.run();
        let statistics = kernel.statistics();
        assert!(statistics.total_requests > 0);
        assert_eq!(statistics.total_requests_blocked, 0);
        assert_eq!(statistics.grade_of_service(), 0.0);
    }

    #[test]
    fn heavy_load_blocks() {
        // Mean inter-arrival 0.02 versus mean service 10: the link saturates
        // immediately and stays saturated.
        let mut settings = testing::two_node_settings(50.0, 0.1);
        settings.time_units = 10.0;
        settings.seed = Some(0xBEEF);
        let mut kernel = Kernel::new(settings).unwrap();
        kernel.run();
        let statistics = kernel.statistics();
        assert!(statistics.total_requests > 10);
        assert!(statistics.grade_of_service() > 0.0);
        assert!(statistics.slot_blocking_probability() > 0.0);
    }

    #[test]
    fn warmup_discards_early_totals() {
        let seed = 0xABCD;
        let mut with = testing::two_node_settings(5.0, 1.0);
        with.time_units = 100.0;
        with.ignore_first = true;
        with.seed = Some(seed);
        let mut without = with.clone();
        without.ignore_first = false;

        let mut kernel_with = Kernel::new(with).unwrap();
        let mut kernel_without = Kernel::new(without).unwrap();
        kernel_with.run();
        kernel_without.run();

        // Warm-up only zeroes counters, so the event sequences are identical
        // and the discarded totals account for the difference.
        assert_eq!(
            kernel_with.statistics().time,
            kernel_without.statistics().time
        );
        assert!(
            kernel_with.statistics().total_requests
                < kernel_without.statistics().total_requests
        );
    }

    #[test]
    fn warmup_zeroes_totals_but_keeps_active_requests() {
        let mut settings = testing::two_node_settings(5.0, 1.0);
        settings.time_units = 100.0;
        settings.ignore_first = true;
        settings.seed = Some(0xCAFE);
        let mut kernel = Kernel::new(settings).unwrap();
        let mut active_before = 0;
        while !kernel.warmup_applied && kernel.has_next() {
            active_before = kernel.statistics().active_requests;
            kernel.next();
        }
        assert!(kernel.warmup_applied);
        assert!(kernel.statistics().time > 10.0);
        // The discarding event itself runs after the wipe: at most one
        // arrival was processed and one follow-up scheduled since.
        assert!(kernel.statistics().total_requests <= 1);
        assert!(kernel.statistics().total_requests_blocked <= 1);
        let active = kernel.statistics().active_requests;
        assert!(active == active_before || active == active_before + 1 || active + 1 == active_before);
    }

    #[test]
    fn snapshots_respect_the_sampling_gap() {
        let mut settings = testing::two_node_settings(5.0, 1.0);
        settings.time_units = 50.0;
        settings.sampling_time = 2.0;
        settings.seed = Some(0x51A1);
        let mut kernel = Kernel::new(settings).unwrap();
        kernel.run();
        let snapshots = kernel.snapshots();
        assert!(snapshots.len() > 1);
        for pair in snapshots.windows(2) {
            assert!(pair[1].time - pair[0].time >= 2.0);
        }
    }

    #[test]
    fn departures_return_spectrum() {
        let mut settings = testing::two_node_settings(1.0, 5.0);
        settings.time_units = 100.0;
        settings.seed = Some(0x0DDB);
        let mut kernel = Kernel::new(settings).unwrap();
        kernel.run();
        // Whatever is still active holds exactly its demand; everything else
        // must have been returned.
        let active = kernel.statistics().active_requests;
        let held: usize = kernel
            .dispatcher
            .carriers()
            .values()
            .map(|spectrum| spectrum.size() - spectrum.available())
            .sum();
        assert_eq!(held as u64, active * 2);
    }

    #[test]
    fn reset_restores_the_constructed_state() {
        let mut settings = testing::two_node_settings(10.0, 1.0);
        settings.time_units = 20.0;
        settings.seed = Some(0x7E57);
        let mut kernel = Kernel::new(settings).unwrap();
        kernel.run();
        assert!(kernel.statistics().total_requests > 1);
        kernel.reset().unwrap();
        assert_eq!(kernel.statistics().total_requests, 1);
        assert_eq!(kernel.statistics().active_requests, 0);
        assert!(kernel.snapshots().is_empty());
        for spectrum in kernel.dispatcher.carriers().values() {
            assert_eq!(spectrum.available(), spectrum.size());
        }
        let scheduled: u64 = kernel
            .settings()
            .request_types
            .iter()
            .map(|ty| ty.counting)
            .sum();
        assert_eq!(scheduled, 1);
    }

    #[test]
    fn blocked_demand_lands_on_the_matching_type() {
        let mut settings = testing::two_node_settings(50.0, 0.1);
        settings.time_units = 5.0;
        settings.seed = Some(0xF00D);
        let mut kernel = Kernel::new(settings).unwrap();
        kernel.run();
        let blocked: u64 = kernel
            .settings()
            .request_types
            .iter()
            .map(|ty| ty.blocking)
            .sum();
        assert_eq!(blocked, kernel.statistics().total_requests_blocked);
        assert_eq!(
            kernel.statistics().total_fsus_blocked,
            Fsus::new(blocked * 2)
        );
    }
}
