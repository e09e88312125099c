//! PID controller for the chamber temperature loop.
//!
//! Maps a temperature error (set point minus measurement, °C) to a
//! power level request. The bridge feeds it one sample per remote
//! `pid_update`; output limits match the power-level range so the bus
//! clamp is a formality.

/// Discrete PID with conditional-integration anti-windup.
pub struct TemperaturePid {
    kp: f32,
    ki: f32,
    kd: f32,
    set_point: f32,
    integral: f32,
    prev_error: f32,
    out_min: f32,
    out_max: f32,
}

impl TemperaturePid {
    pub fn new(kp: f32, ki: f32, kd: f32, set_point: f32) -> Self {
        Self {
            kp,
            ki,
            kd,
            set_point,
            integral: 0.0,
            prev_error: 0.0,
            out_min: 0.0,
            out_max: 100.0,
        }
    }

    pub fn set_limits(&mut self, min: f32, max: f32) {
        self.out_min = min;
        self.out_max = max;
    }

    pub fn set_target(&mut self, set_point: f32) {
        self.set_point = set_point;
    }

    pub fn set_point(&self) -> f32 {
        self.set_point
    }

    /// Feed one temperature sample taken `dt_secs` after the previous
    /// one; returns the requested power level.
    pub fn update(&mut self, measurement: f32, dt_secs: f32) -> f32 {
        let error = self.set_point - measurement;

        let p = self.kp * error;

        let derivative = if dt_secs > 0.0 {
            (error - self.prev_error) / dt_secs
        } else {
            0.0
        };
        let d = self.kd * derivative;
        self.prev_error = error;

        // Conditional integration: freeze the integral while the
        // unsaturated output is already pinned and the error would push
        // it further out.
        let unsaturated = p + self.ki * self.integral + d;
        let saturated_high = unsaturated >= self.out_max && error > 0.0;
        let saturated_low = unsaturated <= self.out_min && error < 0.0;
        if !saturated_high && !saturated_low {
            self.integral += error * dt_secs;
        }

        (p + self.ki * self.integral + d).clamp(self.out_min, self.out_max)
    }

    /// Forget accumulated state (integral, previous error).
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = 0.0;
    }
}
