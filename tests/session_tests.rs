// SPDX-License-Identifier: GPL-3.0-only

//! Virtual camera session behaviour against a simulated loopback device

use std::cell::RefCell;
use std::io;
use std::rc::Rc;
use vcam_filter::backends::virtual_camera::{
    DeviceOpener, OutputDevice, SessionState, VirtualCameraStreamer,
};
use vcam_filter::errors::{DeviceError, StreamerError};
use vcam_filter::media::{Frame, Size};

/// What the simulated device saw
#[derive(Default)]
struct DeviceLog {
    opens: u32,
    formats: Vec<(u32, u32)>,
    frames: Vec<usize>,
    /// Accept only half of the next write
    short_next_write: bool,
}

struct SimulatedLoopback(Rc<RefCell<DeviceLog>>);

impl OutputDevice for SimulatedLoopback {
    fn path(&self) -> &str {
        "/dev/video42"
    }

    fn configure_format(&mut self, width: u32, height: u32) -> Result<(), DeviceError> {
        self.0.borrow_mut().formats.push((width, height));
        Ok(())
    }

    fn write_frame(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut log = self.0.borrow_mut();
        if std::mem::take(&mut log.short_next_write) {
            return Ok(data.len() / 2);
        }
        log.frames.push(data.len());
        Ok(data.len())
    }
}

fn simulated_streamer() -> (
    VirtualCameraStreamer<impl DeviceOpener>,
    Rc<RefCell<DeviceLog>>,
    Rc<RefCell<Vec<StreamerError>>>,
) {
    let log = Rc::new(RefCell::new(DeviceLog::default()));
    let shared = log.clone();
    let opener = move |_: &str| -> Result<Box<dyn OutputDevice>, DeviceError> {
        shared.borrow_mut().opens += 1;
        Ok(Box::new(SimulatedLoopback(shared.clone())))
    };

    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = errors.clone();
    let mut streamer = VirtualCameraStreamer::new(opener);
    streamer.set_error_observer(move |e| sink.borrow_mut().push(e.clone()));
    streamer.set_enabled(true);
    (streamer, log, errors)
}

#[test]
fn test_short_write_reopens_exactly_once() {
    let (mut streamer, log, errors) = simulated_streamer();
    let frame = Frame::solid_rgba(8, 4, [10, 200, 30, 255]).unwrap();

    streamer.on_processed_frame(&frame);
    assert_eq!(log.borrow().opens, 1);

    log.borrow_mut().short_next_write = true;
    streamer.on_processed_frame(&frame);
    assert_eq!(streamer.session().state(), SessionState::Closed);
    assert!(streamer.is_enabled());
    assert!(matches!(
        errors.borrow()[0],
        StreamerError::Device(DeviceError::Write { written: 32, expected: 64, .. })
    ));

    // No re-enable needed: the next frames reopen and reconfigure once
    for _ in 0..3 {
        streamer.on_processed_frame(&frame);
    }

    let log = log.borrow();
    assert_eq!(log.opens, 2);
    assert_eq!(log.formats, vec![(8, 4), (8, 4)]);
    assert_eq!(log.frames, vec![64, 64, 64, 64]);
    assert_eq!(errors.borrow().len(), 1);
}

#[test]
fn test_write_error_keeps_output_enabled() {
    let (mut streamer, log, errors) = simulated_streamer();
    let frame = Frame::solid_rgba(4, 2, [255, 0, 0, 255]).unwrap();

    log.borrow_mut().short_next_write = true;
    streamer.on_processed_frame(&frame);
    assert!(streamer.is_enabled());
    assert!(log.borrow().frames.is_empty());

    streamer.on_processed_frame(&frame);
    assert_eq!(log.borrow().opens, 2);
    assert_eq!(log.borrow().frames, vec![16]);
    assert_eq!(errors.borrow().len(), 1);
}

#[test]
fn test_forced_resolution_from_full_hd() {
    let (mut streamer, log, errors) = simulated_streamer();
    streamer.set_forced_resolution(Some(Size::new(640, 480)));

    let frame = Frame::solid_rgba(1920, 1080, [128, 64, 32, 255]).unwrap();
    streamer.on_processed_frame(&frame);

    assert!(errors.borrow().is_empty());
    let log = log.borrow();
    assert_eq!(log.formats, vec![(640, 480)]);
    assert_eq!(log.frames, vec![640 * 480 * 2]);
}

#[test]
fn test_source_size_change_renegotiates() {
    let (mut streamer, log, _) = simulated_streamer();
    streamer.on_processed_frame(&Frame::solid_rgba(4, 2, [0, 0, 0, 255]).unwrap());
    streamer.on_processed_frame(&Frame::solid_rgba(6, 2, [0, 0, 0, 255]).unwrap());

    let log = log.borrow();
    assert_eq!(log.opens, 2);
    assert_eq!(log.formats, vec![(4, 2), (6, 2)]);
    assert_eq!(log.frames, vec![16, 24]);
}

#[test]
fn test_odd_width_output_size() {
    let (mut streamer, log, _) = simulated_streamer();
    streamer.on_processed_frame(&Frame::solid_rgba(5, 3, [255, 255, 255, 255]).unwrap());
    assert_eq!(log.borrow().frames, vec![5 * 3 * 2]);
}

#[test]
fn test_disable_closes_device() {
    let (mut streamer, _, _) = simulated_streamer();
    streamer.on_processed_frame(&Frame::solid_rgba(2, 2, [0, 0, 0, 255]).unwrap());
    assert!(streamer.session().is_open());

    streamer.set_enabled(false);
    assert!(!streamer.session().is_open());
    assert_eq!(streamer.session().state(), SessionState::Closed);
}
