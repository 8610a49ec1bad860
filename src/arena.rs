//! Tile arena the walkers learn to cross.
//!
//! A rectangular grid with walled borders, optional interior walls, a start
//! tile and a goal tile. Walkers see eight boolean sensors and answer with a
//! column step and a row step. Walking into a wall is fatal.

use crate::config::{ArenaConfig, ConfigError};
use crate::environment::Environment;
use serde::{Deserialize, Serialize};

/// Inputs a walker's genome receives
pub const SENSOR_COUNT: usize = 8;

/// Outputs a walker's genome produces
pub const ACTION_COUNT: usize = 2;

/// Content of one grid cell
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tile {
    Floor,
    Wall,
    Goal,
}

/// Per-walker state
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Walker {
    pub row: usize,
    pub col: usize,
    pub moves: u32,
    pub dead: bool,
    pub reached_goal: bool,
}

/// The grid world
#[derive(Clone, Debug)]
pub struct Arena {
    rows: usize,
    cols: usize,
    tiles: Vec<Tile>,
    start: (usize, usize),
    goal: (usize, usize),
    distance_weight: f32,
    move_weight: f32,
    death_penalty: f32,
}

impl Arena {
    pub fn from_config(config: &ArenaConfig) -> Result<Self, ConfigError> {
        let (rows, cols) = (config.rows, config.cols);
        if rows < 3 || cols < 3 {
            return Err(ConfigError::Invalid("arena must be at least 3x3".to_string()));
        }

        let mut tiles = vec![Tile::Floor; rows * cols];
        for row in 0..rows {
            for col in 0..cols {
                if row == 0 || col == 0 || row == rows - 1 || col == cols - 1 {
                    tiles[row * cols + col] = Tile::Wall;
                }
            }
        }
        for &[row, col] in &config.walls {
            if row >= rows || col >= cols {
                return Err(ConfigError::Invalid(format!("wall ({}, {}) outside the arena", row, col)));
            }
            tiles[row * cols + col] = Tile::Wall;
        }

        let [goal_row, goal_col] = config.goal;
        let [start_row, start_col] = config.start;
        let mut arena = Self {
            rows,
            cols,
            tiles,
            start: (start_row, start_col),
            goal: (goal_row, goal_col),
            distance_weight: config.distance_weight,
            move_weight: config.move_weight,
            death_penalty: config.death_penalty,
        };

        if arena.tile(goal_row as i64, goal_col as i64) != Some(Tile::Floor) {
            return Err(ConfigError::Invalid("goal must be a floor tile".to_string()));
        }
        if arena.tile(start_row as i64, start_col as i64) != Some(Tile::Floor) {
            return Err(ConfigError::Invalid("start must be a floor tile".to_string()));
        }
        arena.tiles[goal_row * cols + goal_col] = Tile::Goal;

        Ok(arena)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn goal(&self) -> (usize, usize) {
        self.goal
    }

    /// Tile at a position, `None` outside the grid
    pub fn tile(&self, row: i64, col: i64) -> Option<Tile> {
        if row < 0 || col < 0 || row as usize >= self.rows || col as usize >= self.cols {
            return None;
        }
        Some(self.tiles[row as usize * self.cols + col as usize])
    }

    /// Anything outside the grid counts as wall
    fn is_wall(&self, row: i64, col: i64) -> bool {
        self.tile(row, col).map_or(true, |t| t == Tile::Wall)
    }

    /// Manhattan distance from a walker to the goal
    pub fn distance_to_goal(&self, walker: &Walker) -> usize {
        walker.row.abs_diff(self.goal.0) + walker.col.abs_diff(self.goal.1)
    }
}

/// Round an action to a -1/0/1 step
fn step_of(actions: &[f32], index: usize) -> i64 {
    actions.get(index).map_or(0, |a| a.round() as i64)
}

fn flag(value: bool) -> f32 {
    if value {
        1.0
    } else {
        0.0
    }
}

impl Environment for Arena {
    type Agent = Walker;

    fn spawn(&self) -> Walker {
        Walker {
            row: self.start.0,
            col: self.start.1,
            moves: 0,
            dead: false,
            reached_goal: false,
        }
    }

    /// Walls left, right, top, bottom; then goal left, right, top, bottom
    fn sense(&self, walker: &Walker) -> Vec<f32> {
        let (row, col) = (walker.row as i64, walker.col as i64);
        let (goal_row, goal_col) = self.goal;

        vec![
            flag(self.is_wall(row, col - 1)),
            flag(self.is_wall(row, col + 1)),
            flag(self.is_wall(row - 1, col)),
            flag(self.is_wall(row + 1, col)),
            flag(walker.col > goal_col),
            flag(walker.col < goal_col),
            flag(walker.row > goal_row),
            flag(walker.row < goal_row),
        ]
    }

    /// `actions[0]` moves along columns, `actions[1]` along rows
    fn act(&self, walker: &mut Walker, actions: &[f32]) {
        if !self.is_alive(walker) {
            return;
        }

        let row = walker.row as i64 + step_of(actions, 1);
        let col = walker.col as i64 + step_of(actions, 0);
        let Some(tile) = self.tile(row, col) else {
            return;
        };

        walker.row = row as usize;
        walker.col = col as usize;
        match tile {
            Tile::Wall => walker.dead = true,
            Tile::Goal => {
                walker.moves += 1;
                walker.reached_goal = true;
            }
            Tile::Floor => walker.moves += 1,
        }
    }

    fn is_alive(&self, walker: &Walker) -> bool {
        !walker.dead && !walker.reached_goal
    }

    fn fitness(&self, walker: &Walker) -> f32 {
        let mut cost = self.distance_weight * self.distance_to_goal(walker) as f32
            + self.move_weight * walker.moves as f32;
        if walker.dead {
            cost += self.death_penalty;
        }
        cost.max(0.0)
    }

    fn is_finished(&self, walker: &Walker) -> bool {
        walker.reached_goal
    }
}
