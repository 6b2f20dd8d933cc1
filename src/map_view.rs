//! Filter and viewport state of the collection point map.
//!
//! The map page downloads every borne once and filters locally. `MapView`
//! owns that state; every transition leaves `visible` consistent with the
//! three filters, and `recomputations` counts how often it was rebuilt.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::filters::contains_ci;
use crate::models::{Borne, BorneStatus};

/// Centre of La Réunion
pub const DEFAULT_CENTER: Coordinate = Coordinate {
    latitude: -21.1151,
    longitude: 55.5364,
};
pub const DEFAULT_ZOOM: u8 = 10;
/// Zoom after picking a borne
pub const DETAIL_ZOOM: u8 = 15;
/// Zoom after locating the user
pub const NEARBY_ZOOM: u8 = 13;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CityFilter {
    #[default]
    All,
    Only(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(BorneStatus),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeolocationError {
    #[error("La géolocalisation n'est pas disponible sur cet appareil")]
    Unavailable,
    #[error("Impossible d'obtenir votre position")]
    Failed,
}

/// Platform position source (browser, OS service, ...)
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn current_position(&self) -> Result<Coordinate, GeolocationError>;
}

#[derive(Debug, Clone)]
pub struct MapView {
    bornes: Vec<Borne>,
    pub city: CityFilter,
    pub status: StatusFilter,
    pub search: String,
    pub selected: Option<Uuid>,
    pub center: Coordinate,
    pub zoom: u8,
    pub user_location: Option<Coordinate>,
    /// Ids of the bornes passing every filter, in list order
    pub visible: Vec<Uuid>,
    pub recomputations: u64,
}

impl MapView {
    pub fn new(bornes: Vec<Borne>) -> Self {
        let visible = bornes.iter().map(|b| b.id).collect();
        MapView {
            bornes,
            city: CityFilter::All,
            status: StatusFilter::All,
            search: String::new(),
            selected: None,
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            user_location: None,
            visible,
            recomputations: 0,
        }
    }

    pub fn bornes(&self) -> &[Borne] {
        &self.bornes
    }

    /// Bornes currently shown, in list order
    pub fn visible_bornes(&self) -> impl Iterator<Item = &Borne> {
        self.bornes.iter().filter(|b| self.visible.contains(&b.id))
    }

    /// Distinct cities for the drop-down, alphabetical
    pub fn cities(&self) -> Vec<String> {
        let mut cities: Vec<String> = self.bornes.iter().map(|b| b.city.clone()).collect();
        cities.sort();
        cities.dedup();
        cities
    }

    pub fn set_city(&mut self, city: CityFilter) {
        self.city = city;
        self.recompute();
    }

    pub fn set_status(&mut self, status: StatusFilter) {
        self.status = status;
        self.recompute();
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
        self.recompute();
    }

    /// Reset the three filters with a single recomputation
    pub fn clear_filters(&mut self) {
        self.city = CityFilter::All;
        self.status = StatusFilter::All;
        self.search.clear();
        self.recompute();
    }

    /// Focus a borne. Unknown ids leave the view as it is.
    pub fn select(&mut self, borne_id: Uuid) {
        let Some(borne) = self.bornes.iter().find(|b| b.id == borne_id) else {
            return;
        };
        self.center = Coordinate {
            latitude: borne.latitude,
            longitude: borne.longitude,
        };
        self.zoom = DETAIL_ZOOM;
        self.selected = Some(borne_id);
    }

    /// Ask the platform for the user's position and center on it
    ///
    /// On failure the error is returned for display and nothing changes.
    pub async fn locate_me<G: Geolocator>(&mut self, geolocator: &G) -> Result<(), GeolocationError> {
        let position = geolocator.current_position().await?;
        self.user_location = Some(position);
        self.center = position;
        self.zoom = NEARBY_ZOOM;
        Ok(())
    }

    fn matches(&self, borne: &Borne) -> bool {
        let city = match &self.city {
            CityFilter::All => true,
            CityFilter::Only(city) => borne.city == *city,
        };
        let status = match self.status {
            StatusFilter::All => true,
            StatusFilter::Only(status) => borne.status == status,
        };
        let query = self.search.trim();
        let search = query.is_empty()
            || contains_ci(&borne.name, query)
            || contains_ci(&borne.address, query)
            || contains_ci(&borne.city, query);

        city && status && search
    }

    fn recompute(&mut self) {
        self.visible = self
            .bornes
            .iter()
            .filter(|b| self.matches(b))
            .map(|b| b.id)
            .collect();
        self.recomputations += 1;
    }
}
