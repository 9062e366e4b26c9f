// src/core/navigator.rs

//! Navegación por secciones con el teclado, tal como la ejecuta la página publicada.
//! El estado vive lo que dura la carga de la página.

use crate::constants::SECTION_SCROLL_OFFSET;

/// Flecha izquierda y flecha arriba.
pub const PREVIOUS_KEYS: [u32; 2] = [37, 38];
/// Flecha derecha y flecha abajo.
pub const NEXT_KEYS: [u32; 2] = [39, 40];

/// Eventos que la página entrega al navegador.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    /// `tpl-ready`: la plantilla terminó de cargar; trae la posición de cada título de sección.
    Ready { section_offsets: Vec<f64> },
    KeyDown(u32),
    /// `story-navigated-section`: punto de extensión para autores, sin efecto.
    SectionNavigated(usize),
}

/// Petición de scroll animado a una posición vertical.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollRequest {
    pub section: usize,
    pub top: f64,
}

#[derive(Debug, Default)]
pub struct SectionNavigator {
    current: Option<usize>,
    section_offsets: Vec<f64>,
    ready: bool,
}

impl SectionNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Índice actual al estilo de la página: -1 cuando no hay sección activa.
    pub fn current_index(&self) -> i64 {
        self.current.map_or(-1, |i| i as i64)
    }

    pub fn max_section(&self) -> i64 {
        self.section_offsets.len() as i64 - 1
    }

    pub fn handle(&mut self, event: PageEvent) -> Option<ScrollRequest> {
        match event {
            PageEvent::Ready { section_offsets } => {
                self.section_offsets = section_offsets;
                self.current = None;
                self.ready = true;
                None
            }
            PageEvent::KeyDown(code) if self.ready => self.key_down(code),
            PageEvent::KeyDown(_) => None,
            PageEvent::SectionNavigated(index) => {
                log::trace!("Sección {} activa", index);
                None
            }
        }
    }

    fn key_down(&mut self, code: u32) -> Option<ScrollRequest> {
        if PREVIOUS_KEYS.contains(&code) {
            if let Some(i) = self.current {
                self.current = Some(i.saturating_sub(1));
            }
        } else if NEXT_KEYS.contains(&code) {
            if self.section_offsets.is_empty() {
                return None;
            }
            let last = self.section_offsets.len() - 1;
            self.current = Some(match self.current {
                Some(i) if i < last => i + 1,
                Some(i) => i,
                None => 0,
            });
        } else {
            return None;
        }
        self.scroll_target()
    }

    /// Sin sección activa no hay scroll; "anterior" en -1 no salta a la última sección.
    fn scroll_target(&self) -> Option<ScrollRequest> {
        let section = self.current?;
        let offset = self.section_offsets.get(section)?;
        Some(ScrollRequest {
            section,
            top: offset - SECTION_SCROLL_OFFSET,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready(sections: usize) -> SectionNavigator {
        let mut nav = SectionNavigator::new();
        let offsets = (0..sections).map(|i| 100.0 + i as f64 * 800.0).collect();
        nav.handle(PageEvent::Ready {
            section_offsets: offsets,
        });
        nav
    }

    #[test]
    fn three_next_one_previous() {
        let mut nav = ready(5);
        assert_eq!(nav.current_index(), -1);
        for _ in 0..3 {
            nav.handle(PageEvent::KeyDown(39));
        }
        let scroll = nav.handle(PageEvent::KeyDown(38)).unwrap();
        assert_eq!(nav.current_index(), 1);
        assert_eq!(scroll, ScrollRequest { section: 1, top: 850.0 });
    }

    #[test]
    fn previous_does_not_underflow() {
        let mut nav = ready(3);
        nav.handle(PageEvent::KeyDown(40));
        assert_eq!(nav.current_index(), 0);
        let scroll = nav.handle(PageEvent::KeyDown(37));
        assert_eq!(nav.current_index(), 0);
        assert_eq!(scroll.map(|s| s.section), Some(0));
    }

    #[test]
    fn next_does_not_overflow() {
        let mut nav = ready(2);
        for _ in 0..5 {
            nav.handle(PageEvent::KeyDown(39));
        }
        assert_eq!(nav.current_index(), nav.max_section());
    }

    #[test]
    fn other_keys_and_placeholder_event_do_nothing() {
        let mut nav = ready(4);
        assert_eq!(nav.handle(PageEvent::KeyDown(13)), None);
        assert_eq!(nav.handle(PageEvent::SectionNavigated(2)), None);
        assert_eq!(nav.current_index(), -1);
    }

    #[test]
    fn previous_before_any_section_stays_inactive() {
        let mut nav = ready(4);
        assert_eq!(nav.handle(PageEvent::KeyDown(37)), None);
        assert_eq!(nav.current_index(), -1);
    }

    #[test]
    fn keys_before_ready_are_ignored() {
        let mut nav = SectionNavigator::new();
        assert_eq!(nav.handle(PageEvent::KeyDown(39)), None);
        assert_eq!(nav.current_index(), -1);
    }
}
