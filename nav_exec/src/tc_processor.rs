//! # Telecommand processor module
//!
//! The telecommand processor applies TCs coming from any source to the navigation controller.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use log::debug;
use nalgebra::Point2;
use thiserror::Error;

// Internal
use crate::{
    auto::{
        map::Polygon,
        nav_ctrl::{NavCmdError, NavCtrl},
    },
    map_repo::{MapData, MapRepoError, MapRepository},
    motor_driver::MotorDriver,
};
use comms_if::tc::Tc;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum TcExecError {
    #[error("Command rejected: {0}")]
    Rejected(NavCmdError),

    #[error("No point of interest named {0:?} in the current map")]
    UnknownPoi(String),

    #[error("Could not load the map: {0}")]
    MapLoad(MapRepoError),
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Execute a telecommand.
///
/// Routes are always planned back to the robot's home position. `map` is the currently loaded
/// map, replaced by `LoadMap`.
pub fn exec<D: MotorDriver>(
    tc: &Tc,
    nav: &mut NavCtrl<D>,
    map: &mut MapData,
    repo: &dyn MapRepository,
) -> Result<(), TcExecError> {
    let home_m = nav.params().robot.home_m();

    match tc {
        Tc::NavigateAndReturn { x_m, y_m } => {
            debug!("Recieved NavigateAndReturn to ({}, {})", x_m, y_m);
            nav.navigate_to_and_return(Point2::new(*x_m, *y_m), home_m)
                .map_err(TcExecError::Rejected)
        }
        Tc::NavigateToPoi { name } => {
            debug!("Recieved NavigateToPoi {:?}", name);
            let dest_m = map
                .poi(name)
                .map(|p| p.position_m())
                .ok_or_else(|| TcExecError::UnknownPoi(name.clone()))?;
            nav.navigate_to_and_return(dest_m, home_m)
                .map_err(TcExecError::Rejected)
        }
        Tc::Reset => {
            debug!("Recieved Reset");
            nav.reset_to_initial_state();
            Ok(())
        }
        Tc::SetSpeedMultiplier { multiplier } => nav
            .set_speed_multiplier(*multiplier)
            .map_err(TcExecError::Rejected),
        Tc::SetForbiddenAreas { areas } => {
            let polygons = Polygon::from_pair_lists(areas);
            map.forbidden_areas = polygons.clone();
            nav.set_forbidden_areas(polygons);
            Ok(())
        }
        Tc::SetAutonomous { enabled } => {
            nav.set_autonomous_mode(*enabled);
            Ok(())
        }
        Tc::MoveManual { forward, turn } => nav
            .move_manual(*forward, *turn)
            .map_err(TcExecError::Rejected),
        Tc::LoadMap { name } => {
            let loaded = repo.load_map(name).map_err(TcExecError::MapLoad)?;
            nav.set_forbidden_areas(loaded.forbidden_areas.clone());
            *map = loaded;
            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        auto::nav_ctrl::NavState, map_repo::PointOfInterest, motor_driver::SimMotorDriver,
        params::NavParams,
    };

    struct OneMap;

    impl MapRepository for OneMap {
        fn load_map(&self, name: &str) -> Result<MapData, MapRepoError> {
            if name == "cafe" {
                MapData::from_json_str(
                    r#"{"forbidden_areas": [[[1.0, 1.0], [2.0, 1.0], [2.0, 2.0], [1.0, 2.0]]],
                        "points_of_interest": {"t7": [2.0, 8.0, "table"]}}"#,
                )
            } else {
                Err(MapRepoError::InvalidName(name.to_string()))
            }
        }
    }

    fn setup() -> (NavCtrl<SimMotorDriver>, MapData) {
        (
            NavCtrl::new(NavParams::default(), SimMotorDriver::new()),
            MapData::default(),
        )
    }

    #[test]
    fn test_navigate_to_poi() {
        let (mut nav, mut map) = setup();

        let tc = Tc::NavigateToPoi {
            name: String::from("t7"),
        };
        assert!(matches!(
            exec(&tc, &mut nav, &mut map, &OneMap),
            Err(TcExecError::UnknownPoi(_))
        ));

        exec(
            &Tc::LoadMap {
                name: String::from("cafe"),
            },
            &mut nav,
            &mut map,
            &OneMap,
        )
        .unwrap();
        assert_eq!(nav.forbidden_areas().len(), 1);
        assert!(nav.obstacle_index().num_blocked() > 0);

        exec(&tc, &mut nav, &mut map, &OneMap).unwrap();
        assert_eq!(nav.state(), NavState::NavigatingToDestination);
        assert_eq!(nav.route().unwrap().destination_m, Point2::new(2.0, 8.0));
        assert_eq!(nav.route().unwrap().base_m, nav.params().robot.home_m());

        assert!(matches!(
            exec(&Tc::MoveManual { forward: 0.1, turn: 0.0 }, &mut nav, &mut map, &OneMap),
            Err(TcExecError::Rejected(NavCmdError::ManualWhileAutonomous))
        ));

        exec(&Tc::Reset, &mut nav, &mut map, &OneMap).unwrap();
        assert_eq!(nav.state(), NavState::Idle);
        assert_eq!(nav.forbidden_areas().len(), 1);
    }

    #[test]
    fn test_settings() {
        let (mut nav, mut map) = setup();
        map.points_of_interest.insert(
            String::from("door"),
            PointOfInterest {
                x_m: 1.0,
                y_m: 1.0,
                kind: String::from("door"),
            },
        );

        exec(
            &Tc::SetForbiddenAreas {
                areas: vec![
                    vec![[3.0, 3.0], [4.0, 3.0], [4.0, 4.0]],
                    vec![[0.0, 0.0], [1.0, 1.0]],
                ],
            },
            &mut nav,
            &mut map,
            &OneMap,
        )
        .unwrap();
        assert_eq!(nav.forbidden_areas().len(), 1);
        assert_eq!(map.forbidden_areas.len(), 1);
        assert!(map.poi("door").is_some());

        exec(&Tc::SetSpeedMultiplier { multiplier: 1.8 }, &mut nav, &mut map, &OneMap).unwrap();
        assert_eq!(nav.get_navigation_status().speed_multiplier, 1.8);

        exec(&Tc::SetAutonomous { enabled: false }, &mut nav, &mut map, &OneMap).unwrap();
        exec(&Tc::MoveManual { forward: 0.2, turn: 0.0 }, &mut nav, &mut map, &OneMap).unwrap();
        assert!((nav.driver().last_demand().left_pct - 20.0).abs() < 1e-9);

        assert!(matches!(
            exec(&Tc::LoadMap { name: String::from("x") }, &mut nav, &mut map, &OneMap),
            Err(TcExecError::MapLoad(_))
        ));
        assert_eq!(nav.forbidden_areas().len(), 1);
    }
}
