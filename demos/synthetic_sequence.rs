use color_eyre::eyre::Result;

use std::{sync::mpsc, thread, time::Duration};
use termion::input::TermRead;
use ekf_monoslam::slam_system::{SlamConfig,MonoSlamSystem};
use ekf_monoslam::tracking::synthetic::{SyntheticScene,SyntheticTracker};
use ekf_monoslam::visualize::spawn_snapshot_consumer;

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt::init();

    let config = match std::env::args().nth(1) {
        Some(path) => SlamConfig::load(&path)?,
        None => SlamConfig::default()
    };
    tracing::info!(filter = %config.filter, "starting synthetic sequence");

    let number_of_frames = 300;
    let scene = SyntheticScene::sideways_motion(400, number_of_frames, 42);
    let tracker = SyntheticTracker::new(config.camera, scene, 320.0, 240.0, config.tracker.clone()).with_pixel_noise(0.5, 7);

    let (tx_snapshot, rx_snapshot) = mpsc::channel();
    let consumer = spawn_snapshot_consumer(rx_snapshot);

    let (tx_abort, rx_abort) = mpsc::channel::<bool>();
    let (tx_done, rx_done) = mpsc::channel::<bool>();
    thread::spawn(move || {
        let mut stdin = termion::async_stdin().keys();
        loop {
            if let Some(Ok(termion::event::Key::Char('q'))) = stdin.next() {
                let _ = tx_abort.send(true);
                break;
            }
            if rx_done.try_recv().is_ok() {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
    });

    let mut system = MonoSlamSystem::new(config.filter.clone(), config.camera, tracker, config.delta_t).with_snapshot_sender(tx_snapshot);
    let reports = system.run(number_of_frames, Some(&rx_abort));
    let _ = tx_done.send(true);
    system.close_snapshot_channel();

    let true_position = system.get_tracker().get_scene().trajectory[reports.len().saturating_sub(1)].position;
    let estimated_position = system.get_filter().get_camera_state().get_position();
    let summary = consumer.join().map_err(|_| color_eyre::eyre::eyre!("snapshot consumer panicked"))?;

    let skipped = reports.iter().filter(|r| r.update_skipped).count();
    println!("frames: {}, skipped updates: {}, features: {}, converged: {}",
        summary.number_of_frames, skipped, summary.last_number_of_features, summary.last_number_of_converged_features);
    // monocular: the estimate is only defined up to scale
    println!("true position: {}, estimated position: {}", true_position.transpose(), estimated_position.transpose());

    Ok(())
}
