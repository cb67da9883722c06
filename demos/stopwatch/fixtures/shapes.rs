// Input for `cargo run -p stopwatch -- rewrite demos/stopwatch/fixtures/shapes.rs /tmp/shapes`.

use laptime::time;

pub struct Circle {
    r: f64,
}

impl Circle {
    #[time(clock = nanosecond, format = "area took %s ns")]
    pub fn area(&self) -> f64 {
        self.r * self.r * std::f64::consts::PI
    }

    #[time]
    pub fn scale(&mut self, factor: f64) -> Result<(), String> {
        if factor <= 0.0 {
            return Err(format!("cannot scale by {factor}"));
        }
        self.r *= factor;
        Ok(())
    }

    #[time(format = "two placeholders %s %s")]
    pub fn broken(&self) {}
}

#[time]
pub fn unit_circle() -> Circle {
    Circle { r: 1.0 }
}
