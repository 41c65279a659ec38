pub mod anchor;
pub mod candidate;
pub mod city;
pub mod config;
pub mod coords;
pub mod embed;
pub mod fallback;
pub mod heightmap;
pub mod planner;
pub mod random;
pub mod surface;
pub mod terrain;
