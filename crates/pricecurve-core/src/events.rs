//! Broadcast of curve activity to live subscribers.
//!
//! A [`crate::CurveService`] with a channel attached publishes every
//! promotion and every ingested sample, in the order the curve applied them.
//! Publishing never blocks the writer: a subscriber that falls more than
//! [`EVENT_CHANNEL_CAPACITY`] events behind loses the oldest ones and sees a
//! lag notice instead.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pubsub::{ImmediatePublisher, PubSubChannel, Subscriber};

use crate::curve::Promotion;
use crate::sample::Sample;

/// Channel capacity for pub-sub events
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Number of subscribers that can listen to curve events
/// - Subscriber 0: live price stream
/// - Subscriber 1: response cache invalidation
pub const EVENT_SUBSCRIBERS: usize = 2;

/// Number of publishers (just the ingesting service)
pub const EVENT_PUBLISHERS: usize = 1;

/// Events published after each append
#[derive(Debug, Clone, PartialEq)]
pub enum CurveEvent {
    /// A window was promoted to the next coarser level
    Promoted(Promotion),
    /// A new sample was ingested at second resolution
    Sample(Sample),
}

pub type CurveChannel = PubSubChannel<
    CriticalSectionRawMutex,
    CurveEvent,
    EVENT_CHANNEL_CAPACITY,
    EVENT_SUBSCRIBERS,
    EVENT_PUBLISHERS,
>;

pub type CurvePublisher<'a> = ImmediatePublisher<
    'a,
    CriticalSectionRawMutex,
    CurveEvent,
    EVENT_CHANNEL_CAPACITY,
    EVENT_SUBSCRIBERS,
    EVENT_PUBLISHERS,
>;

pub type CurveSubscriber<'a> = Subscriber<
    'a,
    CriticalSectionRawMutex,
    CurveEvent,
    EVENT_CHANNEL_CAPACITY,
    EVENT_SUBSCRIBERS,
    EVENT_PUBLISHERS,
>;
