//! PPI/DPPI programmable interconnect (§4.3).
//!
//! Channel subscriber storage follows the teacher's suggestion in spec §9:
//! rather than raw function pointers, each subscriber is an opaque `u32`
//! cookie the owning `World` knows how to route (`World::dispatch_task`).
//! `event_signal` clones the subscriber list out before dispatching so the
//! `World` can freely borrow itself mutably while routing each task —
//! storing `Box<dyn FnMut(&mut World)>` here would alias `&mut World` with
//! the `&mut Dppi` needed to iterate the list.

use sim_engine::FatalError;

/// Growth quantum for a channel's subscriber-list capacity (§4.3 failure
/// model: "subscribing past the capacity ... extends it by a fixed
/// quantum").
const GROWTH_QUANTUM: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeParam {
    WithParam(u32),
    NoParam,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    pub cookie: u32,
    pub param: SubscribeParam,
}

#[derive(Debug, Clone, Default)]
struct Channel {
    subscribers: Vec<Subscription>,
    capacity: usize,
}

impl Channel {
    fn reserve_one(&mut self) {
        if self.subscribers.len() >= self.capacity {
            self.capacity += GROWTH_QUANTUM;
        }
    }
}

pub struct Dppi {
    instance: u32,
    n_channels: usize,
    n_groups: usize,
    channels: Vec<Channel>,
    /// CHEN: bit i set => channel i is enabled for publication.
    chen: u64,
    /// CHG\[n\]: bitmask of channels belonging to group n.
    chg: Vec<u64>,
    /// Shadow of CHG\[n\] taken when a SUBSCRIBE_CHG EN/DIS is armed, so
    /// writes to CHG while subscribed are reverted (§4.3).
    chg_subscribed: Vec<bool>,
}

impl Dppi {
    pub fn new(instance: u32, n_channels: usize, n_groups: usize) -> Self {
        Dppi {
            instance,
            n_channels,
            n_groups,
            channels: vec![Channel::default(); n_channels],
            chen: 0,
            chg: vec![0; n_groups],
            chg_subscribed: vec![false; n_groups],
        }
    }

    pub fn n_channels(&self) -> usize {
        self.n_channels
    }

    fn check_channel(&self, channel: usize) -> Result<(), FatalError> {
        if channel >= self.n_channels {
            return Err(FatalError::new(
                "dppi",
                Some(self.instance),
                format!("channel {channel} does not exist"),
            ));
        }
        Ok(())
    }

    /// `capacity[channel]`, for the §8 invariant check.
    pub fn capacity(&self, channel: usize) -> usize {
        self.channels[channel].capacity
    }

    pub fn subscriber_count(&self, channel: usize) -> usize {
        self.channels[channel].subscribers.len()
    }

    pub fn channel_subscribe(
        &mut self,
        channel: usize,
        cookie: u32,
        param: SubscribeParam,
    ) -> Result<(), FatalError> {
        self.check_channel(channel)?;
        let ch = &mut self.channels[channel];
        if ch
            .subscribers
            .iter()
            .any(|s| s.cookie == cookie && s.param == param)
        {
            return Err(FatalError::new(
                "dppi",
                Some(self.instance),
                format!("channel {channel} subscribed twice by cookie {cookie}"),
            ));
        }
        ch.reserve_one();
        ch.subscribers.push(Subscription { cookie, param });
        Ok(())
    }

    pub fn channel_unsubscribe(
        &mut self,
        channel: usize,
        cookie: u32,
        param: SubscribeParam,
    ) -> Result<(), FatalError> {
        self.check_channel(channel)?;
        let ch = &mut self.channels[channel];
        if let Some(pos) = ch
            .subscribers
            .iter()
            .position(|s| s.cookie == cookie && s.param == param)
        {
            ch.subscribers.remove(pos);
        }
        Ok(())
    }

    /// The standard SUBSCRIBE-register side effect helper (§4.3): given the
    /// previously cached subscription, unsubscribe it if it changed and
    /// subscribe the new one.
    pub fn common_subscribe_sideeffect(
        &mut self,
        channel_reg: u32,
        last: &mut SubscMem,
        cookie: u32,
    ) -> Result<(), FatalError> {
        let new_subscribed = (channel_reg & 0x8000_0000) != 0;
        let new_channel = (channel_reg & 0xFF) as u8;
        if last.subscribed == new_subscribed && last.channel == new_channel {
            return Ok(());
        }
        if last.subscribed {
            self.channel_unsubscribe(last.channel as usize, cookie, SubscribeParam::NoParam)?;
        }
        if new_subscribed {
            self.channel_subscribe(new_channel as usize, cookie, SubscribeParam::NoParam)?;
        }
        last.subscribed = new_subscribed;
        last.channel = new_channel;
        Ok(())
    }

    pub fn chen(&self) -> u64 {
        self.chen
    }

    pub fn set_chenset(&mut self, mask: u64) {
        self.chen |= mask;
    }

    pub fn set_chenclr(&mut self, mask: u64) {
        self.chen &= !mask;
    }

    fn channel_enabled(&self, channel: usize) -> bool {
        channel < 64 && (self.chen & (1u64 << channel)) != 0
    }

    /// Clone out the subscriber list for `channel` if the channel is
    /// enabled in CHEN, else an empty list. Dispatch happens in the caller
    /// (`World::route_task`) since only it knows what each cookie means.
    pub fn event_signal(&self, channel: usize) -> Vec<Subscription> {
        if self.channel_enabled(channel) {
            self.channels
                .get(channel)
                .map(|c| c.subscribers.clone())
                .unwrap_or_default()
        } else {
            Vec::new()
        }
    }

    /// Helper for PUBLISH-register-gated events: top bit enables
    /// publication, low 8 bits select the channel (§4.3).
    pub fn event_signal_if(&self, publish_reg_value: u32) -> Vec<Subscription> {
        if publish_reg_value & 0x8000_0000 != 0 {
            self.event_signal((publish_reg_value & 0xFF) as usize)
        } else {
            Vec::new()
        }
    }

    pub fn task_chg_en(&mut self, group: usize) {
        if group < self.n_groups {
            self.chen |= self.chg[group];
        }
    }

    pub fn task_chg_dis(&mut self, group: usize) {
        if group < self.n_groups {
            self.chen &= !self.chg[group];
        }
    }

    /// Write to CHG\[group\], silently ignored while either of its own
    /// SUBSCRIBE_CHG.EN/DIS is armed (§4.3).
    pub fn write_chg(&mut self, group: usize, mask: u64) {
        if group >= self.n_groups {
            return;
        }
        if self.chg_subscribed[group] {
            return;
        }
        self.chg[group] = mask;
    }

    pub fn set_chg_subscribed(&mut self, group: usize, subscribed: bool) {
        if group < self.n_groups {
            self.chg_subscribed[group] = subscribed;
        }
    }
}

/// Cached last-seen SUBSCRIBE register value (§3 "Subscription slot").
#[derive(Debug, Clone, Copy, Default)]
pub struct SubscMem {
    pub subscribed: bool,
    pub channel: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_signal_respects_chen_and_registration_order() {
        let mut d = Dppi::new(0, 8, 1);
        d.channel_subscribe(3, 10, SubscribeParam::NoParam).unwrap();
        d.channel_subscribe(3, 20, SubscribeParam::NoParam).unwrap();
        assert!(d.event_signal(3).is_empty());
        d.set_chenset(1 << 3);
        let subs = d.event_signal(3);
        assert_eq!(subs.iter().map(|s| s.cookie).collect::<Vec<_>>(), vec![10, 20]);
    }

    #[test]
    fn subscribe_twice_is_an_error() {
        let mut d = Dppi::new(0, 8, 1);
        d.channel_subscribe(0, 1, SubscribeParam::NoParam).unwrap();
        assert!(d.channel_subscribe(0, 1, SubscribeParam::NoParam).is_err());
    }

    #[test]
    fn unsubscribe_round_trip_restores_list() {
        let mut d = Dppi::new(0, 8, 1);
        d.channel_subscribe(1, 5, SubscribeParam::NoParam).unwrap();
        let before = d.channels[1].subscribers.clone();
        d.channel_subscribe(1, 6, SubscribeParam::NoParam).unwrap();
        d.channel_unsubscribe(1, 6, SubscribeParam::NoParam).unwrap();
        assert_eq!(d.channels[1].subscribers, before);
    }

    #[test]
    fn capacity_grows_by_quantum() {
        let mut d = Dppi::new(0, 4, 1);
        for i in 0..GROWTH_QUANTUM as u32 + 1 {
            d.channel_subscribe(0, i, SubscribeParam::NoParam).unwrap();
        }
        assert_eq!(d.capacity(0) % GROWTH_QUANTUM, 0);
        assert!(d.subscriber_count(0) <= d.capacity(0));
    }

    #[test]
    fn chg_write_ignored_while_subscribed() {
        let mut d = Dppi::new(0, 8, 1);
        d.write_chg(0, 0b11);
        d.set_chg_subscribed(0, true);
        d.write_chg(0, 0b1111);
        assert_eq!(d.chg[0], 0b11);
    }
}
