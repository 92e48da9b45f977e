//! Random car generation

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use racetrack_core::{NewCar, TRACK_BODY_COLOR};

const BRANDS: &[&str] = &[
    "Tesla", "Ford", "BMW", "Audi", "Mercedes", "Toyota", "Honda", "Nissan", "Porsche", "Ferrari",
    "Lamborghini", "Mazda", "Subaru", "Volvo", "Lada", "Kia",
];

const MODELS: &[&str] = &[
    "Model S", "Mustang", "M5", "RS6", "AMG GT", "Supra", "Civic", "GT-R", "911", "F40",
    "Huracan", "RX-7", "Impreza", "XC90", "Vesta", "Stinger",
];

/// Produces random cars for the "generate" intent
#[derive(Debug)]
pub struct CarGenerator {
    rng: StdRng,
}

impl CarGenerator {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_car(&mut self) -> NewCar {
        let name = self.random_name();
        let color = self.random_color();
        NewCar::new(name, color)
    }

    pub fn cars(&mut self, count: usize) -> Vec<NewCar> {
        (0..count).map(|_| self.next_car()).collect()
    }

    fn random_name(&mut self) -> String {
        let brand = BRANDS.choose(&mut self.rng).copied().unwrap_or("Lada");
        let model = MODELS.choose(&mut self.rng).copied().unwrap_or("Vesta");
        format!("{brand} {model}")
    }

    /// `#rrggbb`, never the track body color.
    fn random_color(&mut self) -> String {
        loop {
            let color = format!("#{:06x}", self.rng.gen_range(0..=0xff_ffffu32));
            if color != TRACK_BODY_COLOR {
                return color;
            }
        }
    }
}

impl Default for CarGenerator {
    fn default() -> Self {
        Self::from_entropy()
    }
}
