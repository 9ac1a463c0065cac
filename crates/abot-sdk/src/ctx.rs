// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Everything a handler sees during one call.

use abot_core::rpc::{PluginResponse, ScheduleRequest};
use abot_core::{AbotError, Msg};
use chrono::NaiveDateTime;

use crate::memory::Memory;

#[derive(Debug, Clone)]
pub struct Ctx {
    pub msg: Msg,
    pub memory: Memory,
    now: NaiveDateTime,
    scheduled: Vec<ScheduleRequest>,
}

impl Ctx {
    pub fn new(msg: Msg, memory: Memory) -> Self {
        Self::at(msg, memory, chrono::Local::now().naive_local())
    }

    /// Build with an explicit clock.
    pub fn at(msg: Msg, memory: Memory, now: NaiveDateTime) -> Self {
        Self {
            msg,
            memory,
            now,
            scheduled: Vec::new(),
        }
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    /// Ask the core to send `content` to this message's owner at `send_at`.
    pub fn schedule(
        &mut self,
        content: impl Into<String>,
        send_at: NaiveDateTime,
    ) -> Result<(), AbotError> {
        if send_at < self.now {
            return Err(AbotError::BadRequest(
                "cannot schedule time in the past".into(),
            ));
        }
        self.scheduled.push(ScheduleRequest {
            content: content.into(),
            send_at,
        });
        Ok(())
    }

    pub fn scheduled(&self) -> &[ScheduleRequest] {
        &self.scheduled
    }

    pub(crate) fn into_response(self, reply: String) -> PluginResponse {
        PluginResponse {
            reply,
            memory: self.memory.into_delta(),
            scheduled: self.scheduled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn past_schedules_are_rejected() {
        let mut ctx = Ctx::at(Msg::default(), Memory::default(), now());
        assert!(ctx.schedule("late", now() - Duration::minutes(1)).is_err());
        ctx.schedule("soon", now() + Duration::minutes(5)).unwrap();
        assert_eq!(ctx.scheduled().len(), 1);

        let resp = ctx.into_response("ok".into());
        assert_eq!(resp.reply, "ok");
        assert_eq!(resp.scheduled[0].content, "soon");
    }
}
